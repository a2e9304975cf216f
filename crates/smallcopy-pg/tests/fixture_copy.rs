//! Copy behaviour against a real PostgreSQL database.
//!
//! Each test builds a tiny source schema and a matching `smallcopy` schema
//! inside the run transaction, then rolls everything back. To run:
//!   SMALLCOPY_TEST_DATABASE_URL=postgres://localhost/scratch \
//!     cargo test -p smallcopy-pg --test fixture_copy -- --ignored

use smallcopy_core::anonymize::{mask_profile_config, EMAIL_SUFFIX, PLACEHOLDER_PASSWORD_HASH};
use async_trait::async_trait;
use smallcopy_core::{
    advance_sequences, AdvanceSequences, CheckTables, Engine, ImportError, ImportResult, Include,
    InitializeSchema, Rating, RunConfig, RunContext, SequenceManifest, TargetSchema, Unit,
    UnitBody, UnitRegistry,
};
use smallcopy_pg::catalog::statements;
use smallcopy_pg::units::{ProfileCopy, SqlCopy};
use smallcopy_pg::PgTarget;

const SOURCE_SCHEMA: &str = "smallcopy_fixture_source";

const TABLES: &str = "
    CREATE TABLE login (userid serial PRIMARY KEY, login_name text NOT NULL, last_login integer, settings text NOT NULL DEFAULT '', email text);
    CREATE TABLE authbcrypt (userid integer PRIMARY KEY, hashsum text NOT NULL);
    CREATE TABLE submission (submitid serial PRIMARY KEY, folderid integer, userid integer NOT NULL, unixtime integer, title text, content text, subtype integer, rating integer NOT NULL, settings text NOT NULL DEFAULT '', page_views integer, sorttime integer, fave_count integer);
    CREATE TABLE comments (commentid serial PRIMARY KEY, userid integer NOT NULL, target_user integer, target_sub integer, parentid integer, content text, unixtime integer, indent integer, settings text NOT NULL DEFAULT '', hidden_by integer);
    CREATE TABLE media (mediaid serial PRIMARY KEY, media_type text, file_type text, attributes text, sha256 text);
    CREATE TABLE submission_media_links (linkid serial PRIMARY KEY, mediaid integer, submitid integer, link_type text, attributes text);
    CREATE TABLE user_media_links (linkid serial PRIMARY KEY, mediaid integer, userid integer, link_type text, attributes text);
    CREATE TABLE disk_media (mediaid integer PRIMARY KEY, file_path text, file_url text);
    CREATE TABLE media_media_links (linkid serial PRIMARY KEY, described_with_id integer, describee_id integer, link_type text, attributes text);
    CREATE TABLE profile (userid integer PRIMARY KEY, username text NOT NULL, full_name text, catchphrase text, artist_type text, unixtime integer, profile_text text, settings text NOT NULL DEFAULT '', stream_url text, page_views integer, config text NOT NULL DEFAULT '', jsonb_settings jsonb, stream_time integer, stream_text text);
";

const SOURCE_ROWS: &str = "
    INSERT INTO login (userid, login_name) VALUES (1, 'foo'), (2, 'bar'), (3, 'baz');
    INSERT INTO authbcrypt VALUES (1, 'secret-1'), (2, 'secret-2'), (3, 'secret-3');
    INSERT INTO submission (submitid, userid, rating, settings) VALUES
        (100, 1, 20, ''), (101, 1, 21, ''), (102, 1, 10, 'h'), (103, 2, 10, '');
    INSERT INTO comments (commentid, userid, target_sub, parentid, settings) VALUES
        (1, 1, 100, NULL, 'h'),
        (2, 3, 100, 1, ''),
        (3, 1, 100, NULL, ''),
        (4, 3, 100, 3, ''),
        (5, 2, 100, 3, '');
    INSERT INTO media (mediaid) VALUES (10), (11), (12), (13);
    INSERT INTO submission_media_links (mediaid, submitid, link_type) VALUES (10, 100, 'submission'), (13, 103, 'submission');
    INSERT INTO media_media_links (described_with_id, describee_id, link_type) VALUES (11, 10, 'thumbnail'), (12, 11, 'cover');
    INSERT INTO disk_media VALUES (10, 'a', 'a'), (11, 'b', 'b'), (12, 'c', 'c'), (13, 'd', 'd');
    INSERT INTO profile (userid, username, config) VALUES (1, 'foo', 'shm'), (2, 'bar', 'm'), (3, 'baz', 'sh');
";

const TARGET_TABLES: [&str; 10] = [
    "authbcrypt",
    "comments",
    "disk_media",
    "login",
    "media",
    "media_media_links",
    "profile",
    "submission",
    "submission_media_links",
    "user_media_links",
];

/// Every serial column in the fixture; `user_media_links` last.
const TARGET_SEQUENCES: [(&str, &str); 7] = [
    ("comments", "commentid"),
    ("login", "userid"),
    ("media", "mediaid"),
    ("media_media_links", "linkid"),
    ("submission", "submitid"),
    ("submission_media_links", "linkid"),
    ("user_media_links", "linkid"),
];

fn database_url() -> String {
    let _ = dotenvy::dotenv();
    std::env::var("SMALLCOPY_TEST_DATABASE_URL")
        .expect("SMALLCOPY_TEST_DATABASE_URL must name a scratch database")
}

fn schema_script() -> String {
    format!(
        "DROP SCHEMA IF EXISTS smallcopy CASCADE;
         CREATE SCHEMA smallcopy;
         SET search_path = smallcopy;
         {TABLES}"
    )
}

async fn source_fixture() -> PgTarget {
    let mut target = PgTarget::connect(&database_url()).await.unwrap();
    let setup = format!(
        "DROP SCHEMA IF EXISTS {SOURCE_SCHEMA} CASCADE;
         CREATE SCHEMA {SOURCE_SCHEMA};
         SET search_path = {SOURCE_SCHEMA};
         {TABLES}
         {SOURCE_ROWS}"
    );
    target.execute_script(&setup).await.unwrap();
    target
}

fn registry() -> UnitRegistry<PgTarget> {
    let manifest = SequenceManifest::new(&TARGET_SEQUENCES).unwrap();

    let mut registry = UnitRegistry::new(Vec::<String>::new());
    registry
        .register(Unit::new("initialize schema", InitializeSchema::new(schema_script())))
        .unwrap()
        .register(Unit::new("check tables", CheckTables).after(["initialize schema"]))
        .unwrap()
        .register(
            Unit::new("login", SqlCopy::new(statements::LOGIN))
                .after(["check tables"])
                .populates(["login"]),
        )
        .unwrap()
        .register(
            Unit::new("authbcrypt", SqlCopy::new(statements::AUTHBCRYPT))
                .after(["login"])
                .populates(["authbcrypt"])
                .reads(["login"]),
        )
        .unwrap()
        .register(
            Unit::new("profile", ProfileCopy)
                .after(["login"])
                .populates(["profile"])
                .reads(["login"]),
        )
        .unwrap()
        .register(
            Unit::new("submission", SqlCopy::new(statements::SUBMISSION))
                .after(["login"])
                .populates(["submission"])
                .reads(["login"]),
        )
        .unwrap()
        .register(
            Unit::new("comments", SqlCopy::new(statements::COMMENTS))
                .after(["login", "submission"])
                .populates(["comments"])
                .reads(["login", "submission"]),
        )
        .unwrap()
        .register(
            Unit::new("media", SqlCopy::new(statements::MEDIA))
                .after(["login", "submission"])
                .populates([
                    "disk_media",
                    "media",
                    "media_media_links",
                    "submission_media_links",
                    "user_media_links",
                ])
                .reads(["login", "submission"]),
        )
        .unwrap()
        .register(
            Unit::new("update sequences", AdvanceSequences::new(manifest))
                .after(["comments", "login", "media", "submission"]),
        )
        .unwrap();
    registry
}

/// Fails unconditionally, after whatever ran before it has written rows.
struct Reject;

#[async_trait]
impl UnitBody<PgTarget> for Reject {
    async fn run(&self, _: &mut PgTarget, _: &RunContext<'_>) -> ImportResult<()> {
        Err(ImportError::Config("rejected".to_string()))
    }
}

fn config(include: Include) -> RunConfig {
    RunConfig::new(include, Rating::Moderate).with_source_schema(SOURCE_SCHEMA)
}

async fn ids(target: &mut PgTarget, sql: &str) -> Vec<i32> {
    sqlx::query_scalar(sql)
        .fetch_all(target.connection())
        .await
        .unwrap()
}

#[tokio::test]
#[ignore]
async fn allow_list_limits_accounts_and_anonymizes_logins() {
    let mut target = source_fixture().await;
    Engine::new()
        .run(&registry(), &mut target, &config("1,3".parse().unwrap()))
        .await
        .unwrap();

    assert_eq!(
        ids(&mut target, "SELECT userid FROM smallcopy.login ORDER BY userid").await,
        vec![1, 3]
    );

    let email: String =
        sqlx::query_scalar("SELECT email FROM smallcopy.login WHERE userid = 1")
            .fetch_one(target.connection())
            .await
            .unwrap();
    assert_eq!(email, format!("foo{EMAIL_SUFFIX}"));

    let hashes: Vec<String> = sqlx::query_scalar("SELECT DISTINCT hashsum FROM smallcopy.authbcrypt")
        .fetch_all(target.connection())
        .await
        .unwrap();
    assert_eq!(hashes, vec![PLACEHOLDER_PASSWORD_HASH.to_string()]);

    target.rollback().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn rating_ceiling_is_inclusive_and_hidden_content_excluded() {
    let mut target = source_fixture().await;
    Engine::new()
        .run(&registry(), &mut target, &config(Include::All))
        .await
        .unwrap();

    // 101 is one above the ceiling, 102 is hidden
    assert_eq!(
        ids(&mut target, "SELECT submitid FROM smallcopy.submission ORDER BY submitid").await,
        vec![100, 103]
    );

    target.rollback().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn hidden_root_comment_drops_its_subtree() {
    let mut target = source_fixture().await;
    Engine::new()
        .run(&registry(), &mut target, &config("1,3".parse().unwrap()))
        .await
        .unwrap();

    // 1 is hidden so its child 2 goes too; 5 is by an account not copied
    assert_eq!(
        ids(&mut target, "SELECT commentid FROM smallcopy.comments ORDER BY commentid").await,
        vec![3, 4]
    );

    target.rollback().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn media_closure_follows_description_links() {
    let mut target = source_fixture().await;
    Engine::new()
        .run(&registry(), &mut target, &config("1".parse().unwrap()))
        .await
        .unwrap();

    assert_eq!(
        ids(&mut target, "SELECT mediaid FROM smallcopy.media ORDER BY mediaid").await,
        vec![10, 11, 12]
    );
    assert_eq!(
        ids(&mut target, "SELECT mediaid FROM smallcopy.disk_media ORDER BY mediaid").await,
        vec![10, 11, 12]
    );
    assert_eq!(
        ids(&mut target, "SELECT describee_id FROM smallcopy.media_media_links ORDER BY describee_id").await,
        vec![10, 11]
    );

    target.rollback().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn sequences_move_past_copied_ids_and_stay_put() {
    let mut target = source_fixture().await;
    Engine::new()
        .run(&registry(), &mut target, &config(Include::All))
        .await
        .unwrap();

    let manifest = SequenceManifest::new(&TARGET_SEQUENCES).unwrap();

    let first = advance_sequences(&mut target, &manifest).await.unwrap();
    let second = advance_sequences(&mut target, &manifest).await.unwrap();
    assert_eq!(first, second);

    let login = first.iter().find(|reset| reset.table == "login").unwrap();
    assert_eq!(login.next_value, 4);
    let user_media = first
        .iter()
        .find(|reset| reset.table == "user_media_links")
        .unwrap();
    assert_eq!(user_media.next_value, 1);

    let next: i64 = sqlx::query_scalar("SELECT nextval('smallcopy.login_userid_seq')")
        .fetch_one(target.connection())
        .await
        .unwrap();
    assert_eq!(next, 4);

    target.rollback().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn unlisted_sequence_fails_the_run() {
    let mut target = source_fixture().await;
    let manifest = SequenceManifest::new(&TARGET_SEQUENCES[..6]).unwrap();

    let mut registry = UnitRegistry::new(TARGET_TABLES);
    registry
        .register(Unit::new("initialize schema", InitializeSchema::new(schema_script())))
        .unwrap()
        .register(
            Unit::new("update sequences", AdvanceSequences::new(manifest))
                .after(["initialize schema"]),
        )
        .unwrap();

    let err = Engine::new()
        .run(&registry, &mut target, &config(Include::All))
        .await
        .unwrap_err();
    assert_eq!(err.failing_unit(), Some("update sequences"));
    assert!(err.root_cause().to_string().contains("user_media_links_linkid_seq"));

    target.rollback().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn profile_config_is_masked_per_username() {
    let mut target = source_fixture().await;
    Engine::new()
        .run(&registry(), &mut target, &config("1,3".parse().unwrap()))
        .await
        .unwrap();

    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT username, config FROM smallcopy.profile ORDER BY userid")
            .fetch_all(target.connection())
            .await
            .unwrap();

    assert_eq!(
        rows,
        vec![
            ("foo".to_string(), mask_profile_config("foo", "shm")),
            ("baz".to_string(), mask_profile_config("baz", "sh")),
        ]
    );

    target.rollback().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn failed_run_rolls_back_every_unit() {
    let mut target = source_fixture().await;

    let mut registry = UnitRegistry::new(Vec::<String>::new());
    registry
        .register(Unit::new("initialize schema", InitializeSchema::new(schema_script())))
        .unwrap()
        .register(
            Unit::new("login", SqlCopy::new(statements::LOGIN))
                .after(["initialize schema"])
                .populates(["login"]),
        )
        .unwrap()
        .register(Unit::new("reject", Reject).after(["login"]))
        .unwrap();

    let err = Engine::new()
        .run(&registry, &mut target, &config(Include::All))
        .await
        .unwrap_err();
    assert_eq!(err.failing_unit(), Some("reject"));

    // login rows were visible inside the transaction before it was discarded
    let copied: i64 = sqlx::query_scalar("SELECT count(*) FROM smallcopy.login")
        .fetch_one(target.connection())
        .await
        .unwrap();
    assert_eq!(copied, 3);
    target.rollback().await.unwrap();

    let mut fresh = PgTarget::connect(&database_url()).await.unwrap();
    let schemas: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM information_schema.schemata WHERE schema_name::text = ANY ($1)",
    )
    .bind(vec!["smallcopy", SOURCE_SCHEMA])
    .fetch_one(fresh.connection())
    .await
    .unwrap();
    assert_eq!(schemas, 0);

    fresh.rollback().await.unwrap();
}
