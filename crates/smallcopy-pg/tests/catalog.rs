//! Static checks of the Weasyl catalog. No database needed.

use std::collections::BTreeSet;

use smallcopy_core::{SequenceManifest, Unit};
use smallcopy_pg::catalog::{ADD_MEDIA, CHECK_TABLES, INITIALIZE_SCHEMA, UPDATE_SEQUENCES};
use smallcopy_pg::{weasyl_registry, IGNORE_TABLES, SEQUENCES};

const EXPECTED_ORDER: [&str; 38] = [
    "initialize schema",
    "check tables",
    "alembic_version",
    "login",
    "authbcrypt",
    "character",
    "charcomment",
    "folder",
    "submission",
    "collection",
    "comments",
    "commishclass",
    "commishdesc",
    "commishprice",
    "cron_runs",
    "journal",
    "favorite",
    "frienduser",
    "google_doc_embeds",
    "journalcomment",
    "profile",
    "searchtag",
    "searchmapchar",
    "searchmapjournal",
    "searchmapsubmit",
    "submission_tags",
    "siteupdate",
    "tag_updates",
    "user_links",
    "user_streams",
    "user_timezones",
    "useralias",
    "userinfo",
    "userpremium",
    "userstats",
    "watchuser",
    "add necessary media entries",
    "update sequences",
];

#[test]
fn catalog_builds_in_documented_order() {
    let registry = weasyl_registry("CREATE SCHEMA smallcopy;").unwrap();
    let names: Vec<&str> = registry.units().iter().map(Unit::name).collect();
    assert_eq!(names, EXPECTED_ORDER);
    registry.verify_order().unwrap();
}

#[test]
fn administrative_units_bracket_the_copies() {
    let registry = weasyl_registry("").unwrap();
    let units = registry.units();

    assert_eq!(units[0].name(), INITIALIZE_SCHEMA);
    assert!(units[0].tables().is_empty());
    assert_eq!(units[1].name(), CHECK_TABLES);
    assert_eq!(units[1].dependencies(), [INITIALIZE_SCHEMA.to_string()]);

    let last = units.last().unwrap();
    assert_eq!(last.name(), UPDATE_SEQUENCES);
    assert!(last.tables().is_empty());
    assert!(last.dependencies().contains(&ADD_MEDIA.to_string()));
    assert!(last.dependencies().contains(&"login".to_string()));
    assert!(last.dependencies().contains(&"tag_updates".to_string()));
}

#[test]
fn ignored_and_declared_tables_are_disjoint() {
    let registry = weasyl_registry("").unwrap();
    assert_eq!(registry.ignored_tables().len(), IGNORE_TABLES.len());
    assert!(registry
        .declared_tables()
        .is_disjoint(registry.ignored_tables()));
}

#[test]
fn media_unit_owns_every_media_table() {
    let registry = weasyl_registry("").unwrap();
    for table in [
        "disk_media",
        "media",
        "media_media_links",
        "submission_media_links",
        "user_media_links",
    ] {
        assert_eq!(registry.owner_of(table), Some(ADD_MEDIA), "{table}");
    }
}

#[test]
fn every_sequenced_table_is_owned_or_ignored() {
    let registry = weasyl_registry("").unwrap();
    let ignored: BTreeSet<&str> = IGNORE_TABLES.into_iter().collect();

    for (table, _) in SEQUENCES {
        let owned = registry.owner_of(table).is_some();
        assert!(owned || ignored.contains(table), "{table} has no owner");
    }
}

#[test]
fn sequence_owners_run_before_update() {
    let registry = weasyl_registry("").unwrap();
    let update = registry.units().last().unwrap();

    for (table, _) in SEQUENCES {
        if let Some(owner) = registry.owner_of(table) {
            assert!(
                update.dependencies().iter().any(|d| d == owner),
                "{UPDATE_SEQUENCES} must run after {owner}"
            );
        }
    }
}

#[test]
fn sequence_manifest_is_valid() {
    let manifest = SequenceManifest::new(&SEQUENCES).unwrap();
    assert_eq!(manifest.len(), 25);
}

#[test]
fn plan_reports_reads() {
    let registry = weasyl_registry("").unwrap();
    let plan = registry.plan();
    let searchtag = plan.iter().find(|step| step.name == "searchtag").unwrap();
    assert_eq!(searchtag.reads, vec!["character", "journal", "submission"]);
    assert_eq!(searchtag.populates, vec!["searchtag"]);
}
