use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::crawler::models::Site;

#[derive(Debug)]
pub struct Config {
    pub site: Site,
    pub categories_file: PathBuf,
    pub history_file: PathBuf,
    pub output_file: PathBuf,
    /// Bounds concurrent page fetches within a category.
    pub workers: usize,
    /// Explicit override only; TLS verification is on by default.
    pub insecure_tls: bool,
    /// Partition id of this job, used in filenames and log context.
    pub job_id: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let site = Site::from_str(&env::var("SITE")?).map_err(anyhow::Error::msg)?;
        let job_id = env::var("JOB_ID").unwrap_or_else(|_| "1".to_string());

        let categories_file = env::var("CATEGORIES_FILE")
            .unwrap_or_else(|_| format!("categories_{job_id}.json"))
            .into();
        let history_file = env::var("HISTORY_FILE")
            .unwrap_or_else(|_| format!("{}_history.csv", site.prefix()))
            .into();
        let output_file = env::var("OUTPUT_FILE")
            .unwrap_or_else(|_| format!("{}_{}.csv", site.prefix(), job_id))
            .into();

        let workers = match env::var("WORKERS") {
            Ok(v) => v.parse()?,
            Err(_) => 3,
        };
        let insecure_tls = matches!(
            env::var("INSECURE_TLS").as_deref(),
            Ok("1") | Ok("true") | Ok("yes")
        );

        Ok(Self {
            site,
            categories_file,
            history_file,
            output_file,
            workers,
            insecure_tls,
            job_id,
        })
    }
}
