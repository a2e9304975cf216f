//! The Weasyl catalog: every unit of a copy, in execution order.
//!
//! Each unit names the units it runs after, the target tables it fills and
//! the target tables its joins read. The registry rejects a catalog whose
//! declarations disagree with its order before any database work starts.

pub mod statements;

use smallcopy_core::{
    AdvanceSequences, CheckTables, ImportResult, InitializeSchema, SequenceManifest, Unit,
    UnitRegistry,
};

use crate::target::PgTarget;
use crate::units::{ProfileCopy, SqlCopy, Statement};

/// Target tables deliberately left empty.
pub const IGNORE_TABLES: [&str; 25] = [
    "ads",
    "api_tokens",
    "artist_optout_tags",
    "artist_preferred_tags",
    "blocktag",
    "emailblacklist",
    "emailverify",
    "forgotpassword",
    "globally_restricted_tags",
    "ignoreuser",
    "logincreate",
    "message",
    "oauth_bearer_tokens",
    "oauth_consumers",
    "permaban",
    "premiumpurchase",
    "report",
    "reportcomment",
    "sessions",
    "suspension",
    "twofa_recovery_codes",
    "user_restricted_tags",
    "views",
    "welcome",
    "welcomecount",
];

/// Every `(table, column)` in the target schema backed by a sequence.
pub const SEQUENCES: [(&str, &str); 25] = [
    ("ads", "id"),
    ("character", "charid"),
    ("charcomment", "commentid"),
    ("comments", "commentid"),
    ("commishclass", "classid"),
    ("commishprice", "priceid"),
    ("emailblacklist", "id"),
    ("folder", "folderid"),
    ("journal", "journalid"),
    ("journalcomment", "commentid"),
    ("login", "userid"),
    ("media_media_links", "linkid"),
    ("media", "mediaid"),
    ("message", "noteid"),
    ("oauth_bearer_tokens", "id"),
    ("report", "reportid"),
    ("reportcomment", "commentid"),
    ("searchtag", "tagid"),
    ("siteupdate", "updateid"),
    ("submission_media_links", "linkid"),
    ("submission", "submitid"),
    ("tag_updates", "updateid"),
    ("user_links", "linkid"),
    ("user_media_links", "linkid"),
    ("welcome", "welcomeid"),
];

pub const INITIALIZE_SCHEMA: &str = "initialize schema";
pub const CHECK_TABLES: &str = "check tables";
pub const ADD_MEDIA: &str = "add necessary media entries";
pub const UPDATE_SEQUENCES: &str = "update sequences";

/// Unit copying one table with a single statement list.
fn copy(name: &str, statements: &'static [Statement]) -> Unit<PgTarget> {
    Unit::new(name, SqlCopy::new(statements))
        .populates(statements.iter().map(|statement| statement.table))
        .after([CHECK_TABLES])
}

/// Build the registry for a Weasyl copy.
///
/// `schema_script` is the SQL that creates the `smallcopy` schema.
pub fn weasyl_registry(schema_script: impl Into<String>) -> ImportResult<UnitRegistry<PgTarget>> {
    let manifest = SequenceManifest::new(&SEQUENCES)?;
    let mut registry = UnitRegistry::new(IGNORE_TABLES);

    registry
        .register(Unit::new(INITIALIZE_SCHEMA, InitializeSchema::new(schema_script)))?
        .register(Unit::new(CHECK_TABLES, CheckTables).after([INITIALIZE_SCHEMA]))?
        .register(copy("alembic_version", statements::ALEMBIC_VERSION))?
        .register(copy("login", statements::LOGIN))?
        .register(
            copy("authbcrypt", statements::AUTHBCRYPT)
                .after(["login"])
                .reads(["login"]),
        )?
        .register(
            copy("character", statements::CHARACTER)
                .after(["login"])
                .reads(["login"]),
        )?
        .register(
            copy("charcomment", statements::CHARCOMMENT)
                .after(["character", "login"])
                .reads(["character", "login"]),
        )?
        .register(
            copy("folder", statements::FOLDER)
                .after(["login"])
                .reads(["login"]),
        )?
        .register(
            copy("submission", statements::SUBMISSION)
                .after(["login"])
                .reads(["login"]),
        )?
        .register(
            copy("collection", statements::COLLECTION)
                .after(["login", "submission"])
                .reads(["login", "submission"]),
        )?
        .register(
            copy("comments", statements::COMMENTS)
                .after(["login", "submission"])
                .reads(["login", "submission"]),
        )?
        .register(
            copy("commishclass", statements::COMMISHCLASS)
                .after(["login"])
                .reads(["login"]),
        )?
        .register(
            copy("commishdesc", statements::COMMISHDESC)
                .after(["login"])
                .reads(["login"]),
        )?
        .register(
            copy("commishprice", statements::COMMISHPRICE)
                .after(["commishclass", "login"])
                .reads(["login"]),
        )?
        .register(copy("cron_runs", statements::CRON_RUNS))?
        .register(
            copy("journal", statements::JOURNAL)
                .after(["login"])
                .reads(["login"]),
        )?
        .register(
            copy("favorite", statements::FAVORITE)
                .after(["character", "journal", "login", "submission"])
                .reads(["character", "journal", "login", "submission"]),
        )?
        .register(
            copy("frienduser", statements::FRIENDUSER)
                .after(["login"])
                .reads(["login"]),
        )?
        .register(
            copy("google_doc_embeds", statements::GOOGLE_DOC_EMBEDS)
                .after(["submission"])
                .reads(["submission"]),
        )?
        .register(
            copy("journalcomment", statements::JOURNALCOMMENT)
                .after(["journal", "login"])
                .reads(["journal", "login"]),
        )?
        .register(
            Unit::new("profile", ProfileCopy)
                .after([CHECK_TABLES, "login"])
                .populates(["profile"])
                .reads(["login"]),
        )?
        .register(
            copy("searchtag", statements::SEARCHTAG)
                .after(["character", "journal", "submission"])
                .reads(["character", "journal", "submission"]),
        )?
        .register(
            copy("searchmapchar", statements::SEARCHMAPCHAR)
                .after(["character", "searchtag"])
                .reads(["character"]),
        )?
        .register(
            copy("searchmapjournal", statements::SEARCHMAPJOURNAL)
                .after(["journal", "searchtag"])
                .reads(["journal"]),
        )?
        .register(
            copy("searchmapsubmit", statements::SEARCHMAPSUBMIT)
                .after(["searchtag", "submission"])
                .reads(["submission"]),
        )?
        .register(
            copy("submission_tags", statements::SUBMISSION_TAGS)
                .after(["searchtag", "submission"])
                .reads(["submission"]),
        )?
        .register(
            copy("siteupdate", statements::SITEUPDATE)
                .after(["login"])
                .reads(["login"]),
        )?
        .register(
            copy("tag_updates", statements::TAG_UPDATES)
                .after(["login", "submission"])
                .reads(["login", "submission"]),
        )?
        .register(
            copy("user_links", statements::USER_LINKS)
                .after(["login"])
                .reads(["login"]),
        )?
        .register(
            copy("user_streams", statements::USER_STREAMS)
                .after(["login"])
                .reads(["login"]),
        )?
        .register(
            copy("user_timezones", statements::USER_TIMEZONES)
                .after(["login"])
                .reads(["login"]),
        )?
        .register(
            copy("useralias", statements::USERALIAS)
                .after(["login"])
                .reads(["login"]),
        )?
        .register(
            copy("userinfo", statements::USERINFO)
                .after(["login"])
                .reads(["login"]),
        )?
        .register(
            copy("userpremium", statements::USERPREMIUM)
                .after(["login"])
                .reads(["login"]),
        )?
        .register(
            copy("userstats", statements::USERSTATS)
                .after(["login"])
                .reads(["login"]),
        )?
        .register(
            copy("watchuser", statements::WATCHUSER)
                .after(["login"])
                .reads(["login"]),
        )?
        .register(
            copy(ADD_MEDIA, statements::MEDIA)
                .after(["login", "submission"])
                .reads(["login", "submission"]),
        )?;

    // Every unit filling a sequenced table runs before the sequences move.
    let sequenced = registry.owners_of(manifest.tables());
    registry.register(Unit::new(UPDATE_SEQUENCES, AdvanceSequences::new(manifest)).after(sequenced))?;

    Ok(registry)
}
