//! Copy statements for each Weasyl table.
//!
//! Unqualified names resolve to the source schema; `smallcopy.` names are
//! the target. Joins against already-copied target tables provide the
//! referential closure.

use crate::units::{Param, Statement};

pub const ALEMBIC_VERSION: &[Statement] = &[Statement::new(
    "alembic_version",
    "INSERT INTO smallcopy.alembic_version SELECT * FROM alembic_version",
)];

pub const LOGIN: &[Statement] = &[Statement::new(
    "login",
    "
    INSERT INTO smallcopy.login (userid, login_name, last_login, settings, email)
    SELECT userid, login_name, 0, settings, login_name || $2
    FROM login
    WHERE $1::integer[] IS NULL OR userid = ANY ($1)
    ",
)
.with_params(&[Param::Include, Param::EmailSuffix])];

pub const AUTHBCRYPT: &[Statement] = &[Statement::new(
    "authbcrypt",
    "
    INSERT INTO smallcopy.authbcrypt (userid, hashsum)
    SELECT userid, $1 FROM authbcrypt INNER JOIN smallcopy.login USING (userid)
    ",
)
.with_params(&[Param::PasswordHash])];

pub const CHARACTER: &[Statement] = &[Statement::new(
    "character",
    "
    INSERT INTO smallcopy.character (charid, userid, unixtime, char_name, age, gender, height, weight, species, content, rating, settings, page_views)
    SELECT charid, userid, unixtime, char_name, age, gender, height, weight, species, content, rating, character.settings, page_views
    FROM character
        INNER JOIN smallcopy.login USING (userid)
    WHERE
        rating <= $1 AND
        character.settings !~ '[hf]'
    ",
)
.with_params(&[Param::MaximumRating])];

pub const CHARCOMMENT: &[Statement] = &[Statement::new(
    "charcomment",
    "
    INSERT INTO smallcopy.charcomment (commentid, userid, targetid, parentid, content, unixtime, indent, settings, hidden_by)
    WITH RECURSIVE t AS (
        SELECT commentid, charcomment.userid, targetid, parentid, charcomment.content, charcomment.unixtime, indent, charcomment.settings, hidden_by
        FROM charcomment
            INNER JOIN smallcopy.character ch ON targetid = charid
            INNER JOIN smallcopy.login ccu ON charcomment.userid = ccu.userid
        WHERE
            parentid = 0 AND
            charcomment.settings !~ '[hs]'
        UNION SELECT charcomment.commentid, charcomment.userid, charcomment.targetid, charcomment.parentid, charcomment.content, charcomment.unixtime, charcomment.indent, charcomment.settings, charcomment.hidden_by
        FROM charcomment
            INNER JOIN t ON charcomment.parentid = t.commentid
            INNER JOIN smallcopy.login ccu ON charcomment.userid = ccu.userid
        WHERE charcomment.settings !~ '[hs]'
    )
        SELECT * FROM t
    ",
)];

pub const FOLDER: &[Statement] = &[Statement::new(
    "folder",
    "
    INSERT INTO smallcopy.folder (folderid, parentid, userid, title, settings)
    SELECT folderid, parentid, userid, title, folder.settings FROM folder INNER JOIN smallcopy.login USING (userid)
    ",
)];

pub const SUBMISSION: &[Statement] = &[Statement::new(
    "submission",
    "
    INSERT INTO smallcopy.submission (submitid, folderid, userid, unixtime, title, content, subtype, rating, settings, page_views, sorttime, fave_count)
    SELECT submitid, folderid, userid, unixtime, title, content, subtype, rating, submission.settings, page_views, sorttime, fave_count
    FROM submission
        INNER JOIN smallcopy.login USING (userid)
    WHERE rating <= $1 AND submission.settings !~ '[hf]'
    ",
)
.with_params(&[Param::MaximumRating])];

pub const COLLECTION: &[Statement] = &[Statement::new(
    "collection",
    "
    INSERT INTO smallcopy.collection (userid, submitid, unixtime, settings)
    SELECT collection.userid, submitid, collection.unixtime, collection.settings
    FROM collection
        INNER JOIN smallcopy.submission USING (submitid)
        INNER JOIN smallcopy.login cu ON collection.userid = cu.userid
    ",
)];

pub const COMMENTS: &[Statement] = &[Statement::new(
    "comments",
    "
    INSERT INTO smallcopy.comments (commentid, userid, target_user, target_sub, parentid, content, unixtime, indent, settings, hidden_by)
    WITH RECURSIVE t AS (
        SELECT commentid, comments.userid, target_user, target_sub, parentid, comments.content, comments.unixtime, indent, comments.settings, hidden_by
        FROM comments
            INNER JOIN smallcopy.login co ON comments.userid = co.userid
            LEFT JOIN smallcopy.submission ON target_sub = submitid
            LEFT JOIN smallcopy.login ct ON target_user = ct.userid
        WHERE
            (submitid IS NOT NULL OR ct.userid IS NOT NULL) AND
            parentid IS NULL AND
            comments.settings !~ '[hs]'
        UNION SELECT comments.commentid, comments.userid, comments.target_user, comments.target_sub, comments.parentid, comments.content, comments.unixtime, comments.indent, comments.settings, comments.hidden_by
        FROM comments
            INNER JOIN t ON comments.parentid = t.commentid
            INNER JOIN smallcopy.login co ON comments.userid = co.userid
        WHERE comments.settings !~ '[hs]'
    )
        SELECT * FROM t
    ",
)];

pub const COMMISHCLASS: &[Statement] = &[Statement::new(
    "commishclass",
    "
    INSERT INTO smallcopy.commishclass (classid, userid, title)
    SELECT classid, userid, title FROM commishclass INNER JOIN smallcopy.login USING (userid)
    ",
)];

pub const COMMISHDESC: &[Statement] = &[Statement::new(
    "commishdesc",
    "
    INSERT INTO smallcopy.commishdesc (userid, content)
    SELECT userid, content FROM commishdesc INNER JOIN smallcopy.login USING (userid)
    ",
)];

pub const COMMISHPRICE: &[Statement] = &[Statement::new(
    "commishprice",
    "
    INSERT INTO smallcopy.commishprice (priceid, classid, userid, title, amount_min, amount_max, settings)
    SELECT priceid, classid, userid, title, amount_min, amount_max, commishprice.settings
    FROM commishprice INNER JOIN smallcopy.login USING (userid)
    ",
)];

pub const CRON_RUNS: &[Statement] = &[Statement::new(
    "cron_runs",
    "INSERT INTO smallcopy.cron_runs (last_run) SELECT last_run FROM cron_runs",
)];

pub const JOURNAL: &[Statement] = &[Statement::new(
    "journal",
    "
    INSERT INTO smallcopy.journal (journalid, userid, title, rating, unixtime, settings, page_views)
    SELECT journalid, userid, title, rating, unixtime, journal.settings, page_views
    FROM journal
        INNER JOIN smallcopy.login USING (userid)
    WHERE
        rating <= $1 AND
        journal.settings !~ '[hf]'
    ",
)
.with_params(&[Param::MaximumRating])];

pub const FAVORITE: &[Statement] = &[Statement::new(
    "favorite",
    "
    INSERT INTO smallcopy.favorite (userid, targetid, type, unixtime, settings)
    SELECT favorite.userid, targetid, type, favorite.unixtime, favorite.settings
    FROM favorite
        INNER JOIN smallcopy.login fu ON favorite.userid = fu.userid
        INNER JOIN profile ON favorite.userid = profile.userid
        LEFT JOIN smallcopy.submission ON favorite.type = 's' AND favorite.targetid = submission.submitid
        LEFT JOIN smallcopy.character ON favorite.type = 'f' AND favorite.targetid = character.charid
        LEFT JOIN smallcopy.journal ON favorite.type = 'j' AND favorite.targetid = journal.journalid
    WHERE profile.config !~ '[hv]' AND (
        submitid IS NOT NULL OR
        charid IS NOT NULL OR
        journalid IS NOT NULL)
    ",
)];

pub const FRIENDUSER: &[Statement] = &[Statement::new(
    "frienduser",
    "
    INSERT INTO smallcopy.frienduser (userid, otherid, settings, unixtime)
    SELECT frienduser.userid, otherid, frienduser.settings, unixtime
    FROM frienduser
        INNER JOIN smallcopy.login fu ON frienduser.userid = fu.userid
        INNER JOIN smallcopy.login fo ON frienduser.otherid = fo.userid
    WHERE position('p' in frienduser.settings) = 0
    ",
)];

pub const GOOGLE_DOC_EMBEDS: &[Statement] = &[Statement::new(
    "google_doc_embeds",
    "
    INSERT INTO smallcopy.google_doc_embeds (submitid, embed_url)
    SELECT submitid, embed_url
    FROM google_doc_embeds
        INNER JOIN smallcopy.submission USING (submitid)
    ",
)];

pub const JOURNALCOMMENT: &[Statement] = &[Statement::new(
    "journalcomment",
    "
    INSERT INTO smallcopy.journalcomment (commentid, userid, targetid, parentid, content, unixtime, indent, settings, hidden_by)
    WITH RECURSIVE t AS (
        SELECT commentid, journalcomment.userid, targetid, parentid, content, journalcomment.unixtime, indent, journalcomment.settings, hidden_by
        FROM journalcomment
            INNER JOIN smallcopy.journal ON targetid = journalid
            INNER JOIN smallcopy.login jcu ON journalcomment.userid = jcu.userid
        WHERE
            parentid = 0 AND
            position('h' in journalcomment.settings) = 0
        UNION SELECT journalcomment.commentid, journalcomment.userid, journalcomment.targetid, journalcomment.parentid, journalcomment.content, journalcomment.unixtime, journalcomment.indent, journalcomment.settings, journalcomment.hidden_by
        FROM journalcomment
            INNER JOIN t ON journalcomment.parentid = t.commentid
            INNER JOIN smallcopy.login jcu ON journalcomment.userid = jcu.userid
        WHERE position('h' in journalcomment.settings) = 0
    )
        SELECT * FROM t
    ",
)];

pub const SEARCHTAG: &[Statement] = &[Statement::new(
    "searchtag",
    "
    INSERT INTO smallcopy.searchtag (tagid, title)
    SELECT tagid, title
    FROM (
        SELECT tagid FROM searchmapchar INNER JOIN smallcopy.character ON targetid = charid
        UNION SELECT tagid FROM searchmapjournal INNER JOIN smallcopy.journal ON targetid = journalid
        UNION SELECT tagid FROM searchmapsubmit INNER JOIN smallcopy.submission ON targetid = submitid
    ) AS t
        INNER JOIN searchtag USING (tagid)
    ",
)];

pub const SEARCHMAPCHAR: &[Statement] = &[Statement::new(
    "searchmapchar",
    "
    INSERT INTO smallcopy.searchmapchar (tagid, targetid, settings)
    SELECT tagid, targetid, searchmapchar.settings
    FROM searchmapchar INNER JOIN smallcopy.character ON targetid = charid
    ",
)];

pub const SEARCHMAPJOURNAL: &[Statement] = &[Statement::new(
    "searchmapjournal",
    "
    INSERT INTO smallcopy.searchmapjournal (tagid, targetid, settings)
    SELECT tagid, targetid, searchmapjournal.settings
    FROM searchmapjournal INNER JOIN smallcopy.journal ON targetid = journalid
    ",
)];

pub const SEARCHMAPSUBMIT: &[Statement] = &[Statement::new(
    "searchmapsubmit",
    "
    INSERT INTO smallcopy.searchmapsubmit (tagid, targetid, settings)
    SELECT tagid, targetid, searchmapsubmit.settings
    FROM searchmapsubmit INNER JOIN smallcopy.submission ON targetid = submitid
    ",
)];

pub const SUBMISSION_TAGS: &[Statement] = &[Statement::new(
    "submission_tags",
    "
    INSERT INTO smallcopy.submission_tags (submitid, tags)
    SELECT submitid, tags FROM submission_tags INNER JOIN smallcopy.submission USING (submitid)
    ",
)];

pub const SITEUPDATE: &[Statement] = &[Statement::new(
    "siteupdate",
    "
    INSERT INTO smallcopy.siteupdate (updateid, userid, title, content, unixtime)
    SELECT updateid, userid, title, content, unixtime FROM siteupdate INNER JOIN smallcopy.login USING (userid)
    ",
)];

pub const TAG_UPDATES: &[Statement] = &[Statement::new(
    "tag_updates",
    "
    INSERT INTO smallcopy.tag_updates (updateid, submitid, userid, added, removed, updated_at)
    SELECT updateid, submitid, tag_updates.userid, added, removed, updated_at
    FROM tag_updates
        INNER JOIN smallcopy.submission USING (submitid)
        INNER JOIN smallcopy.login ON tag_updates.userid = login.userid
    ",
)];

pub const USER_LINKS: &[Statement] = &[Statement::new(
    "user_links",
    "
    INSERT INTO smallcopy.user_links (linkid, userid, link_type, link_value)
    SELECT linkid, userid, link_type, link_value FROM user_links INNER JOIN smallcopy.login USING (userid)
    ",
)];

pub const USER_STREAMS: &[Statement] = &[Statement::new(
    "user_streams",
    "
    INSERT INTO smallcopy.user_streams (userid, start_time, end_time)
    SELECT userid, start_time, end_time FROM user_streams INNER JOIN smallcopy.login USING (userid)
    ",
)];

pub const USER_TIMEZONES: &[Statement] = &[Statement::new(
    "user_timezones",
    "
    INSERT INTO smallcopy.user_timezones (userid, timezone)
    SELECT userid, timezone FROM user_timezones INNER JOIN smallcopy.login USING (userid)
    ",
)];

pub const USERALIAS: &[Statement] = &[Statement::new(
    "useralias",
    "
    INSERT INTO smallcopy.useralias (userid, alias_name, settings)
    SELECT userid, alias_name, useralias.settings FROM useralias INNER JOIN smallcopy.login USING (userid)
    ",
)];

pub const USERINFO: &[Statement] = &[Statement::new(
    "userinfo",
    "
    INSERT INTO smallcopy.userinfo (userid, birthday, gender, country)
    SELECT userid, 0, gender, country FROM userinfo INNER JOIN smallcopy.login USING (userid)
    ",
)];

pub const USERPREMIUM: &[Statement] = &[Statement::new(
    "userpremium",
    "
    INSERT INTO smallcopy.userpremium (userid, unixtime, terms)
    SELECT userid, unixtime, terms FROM userpremium INNER JOIN smallcopy.login USING (userid)
    ",
)];

pub const USERSTATS: &[Statement] = &[Statement::new(
    "userstats",
    "
    INSERT INTO smallcopy.userstats (userid, page_views, submit_views, followers, faved_works, journals, submits, characters, collects, faves)
    SELECT userid, page_views, submit_views, followers, faved_works, journals, submits, characters, collects, faves
    FROM userstats INNER JOIN smallcopy.login USING (userid)
    ",
)];

pub const WATCHUSER: &[Statement] = &[Statement::new(
    "watchuser",
    "
    INSERT INTO smallcopy.watchuser (userid, otherid, settings, unixtime)
    SELECT watchuser.userid, otherid, watchuser.settings, unixtime
    FROM watchuser
        INNER JOIN smallcopy.login u USING (userid)
        INNER JOIN smallcopy.login o ON otherid = o.userid
    ",
)];

/// Media reachable from copied submissions and accounts, closed over the
/// "described with" relation.
macro_rules! media_closure {
    () => {
        "
    WITH RECURSIVE t AS (
        SELECT mediaid FROM submission_media_links
            INNER JOIN smallcopy.submission USING (submitid)
        UNION SELECT mediaid FROM user_media_links
            INNER JOIN smallcopy.login USING (userid)
        UNION SELECT described_with_id FROM media_media_links
            INNER JOIN t ON describee_id = mediaid
    )
    "
    };
}

pub const MEDIA: &[Statement] = &[
    Statement::new(
        "media",
        concat!(
            "INSERT INTO smallcopy.media (mediaid, media_type, file_type, attributes, sha256)",
            media_closure!(),
            "SELECT mediaid, media_type, file_type, attributes, sha256 FROM t INNER JOIN media USING (mediaid)",
        ),
    ),
    Statement::new(
        "submission_media_links",
        "
        INSERT INTO smallcopy.submission_media_links (linkid, mediaid, submitid, link_type, attributes)
        SELECT linkid, mediaid, submitid, link_type, attributes FROM submission_media_links
            INNER JOIN smallcopy.submission USING (submitid)
        ",
    ),
    Statement::new(
        "user_media_links",
        "
        INSERT INTO smallcopy.user_media_links (linkid, mediaid, userid, link_type, attributes)
        SELECT linkid, mediaid, userid, link_type, attributes FROM user_media_links
            INNER JOIN smallcopy.login USING (userid)
        ",
    ),
    Statement::new(
        "disk_media",
        "
        INSERT INTO smallcopy.disk_media (mediaid, file_path, file_url)
        SELECT mediaid, file_path, file_url FROM disk_media
            INNER JOIN smallcopy.media USING (mediaid)
        ",
    ),
    Statement::new(
        "media_media_links",
        concat!(
            "INSERT INTO smallcopy.media_media_links (linkid, described_with_id, describee_id, link_type, attributes)",
            media_closure!(),
            "SELECT linkid, described_with_id, describee_id, link_type, attributes
            FROM media_media_links
                INNER JOIN t ON describee_id = t.mediaid",
        ),
    ),
];
