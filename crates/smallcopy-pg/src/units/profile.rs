//! Profile copy with masked config flags.
//!
//! Profiles are copied as-is for copied accounts, then their `config`
//! column is rewritten with [`mask_profile_config`]. Both steps run in the
//! run transaction, so unmasked values are never committed.

use async_trait::async_trait;
use smallcopy_core::anonymize::mask_profile_config;
use smallcopy_core::{ImportResult, RunContext, UnitBody};
use tracing::info;

use crate::target::{query_error, PgTarget};

const COPY_PROFILES: &str = "
    INSERT INTO smallcopy.profile (userid, username, full_name, catchphrase, artist_type, unixtime, profile_text, settings, stream_url, page_views, config, jsonb_settings, stream_time, stream_text)
    SELECT
        userid, username, full_name, catchphrase, artist_type, unixtime, profile_text, profile.settings,
        stream_url, page_views, config, jsonb_settings, stream_time, stream_text
    FROM profile
        INNER JOIN smallcopy.login USING (userid)
";

const READ_CONFIGS: &str = "SELECT userid, username::text, config::text FROM smallcopy.profile";

const WRITE_CONFIGS: &str = "
    UPDATE smallcopy.profile
    SET config = masked.config
    FROM UNNEST($1::integer[], $2::text[]) AS masked (userid, config)
    WHERE profile.userid = masked.userid
";

/// Copies `profile` and masks the identifying config flags.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileCopy;

#[async_trait]
impl UnitBody<PgTarget> for ProfileCopy {
    async fn run(&self, target: &mut PgTarget, _ctx: &RunContext<'_>) -> ImportResult<()> {
        let copied = sqlx::query(COPY_PROFILES)
            .execute(target.connection())
            .await
            .map_err(query_error)?;

        let rows: Vec<(i32, String, Option<String>)> = sqlx::query_as(READ_CONFIGS)
            .fetch_all(target.connection())
            .await
            .map_err(query_error)?;

        let (userids, configs): (Vec<i32>, Vec<String>) = rows
            .into_iter()
            .filter_map(|(userid, username, config)| {
                config.map(|config| (userid, mask_profile_config(&username, &config)))
            })
            .unzip();

        let masked = sqlx::query(WRITE_CONFIGS)
            .bind(userids)
            .bind(configs)
            .execute(target.connection())
            .await
            .map_err(query_error)?;

        info!(
            table = "profile",
            rows = copied.rows_affected(),
            masked = masked.rows_affected(),
            "Copied rows"
        );
        Ok(())
    }
}
