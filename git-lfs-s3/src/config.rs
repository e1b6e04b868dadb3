use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use structopt::StructOpt;
use url::Url;

/// Longest lifetime S3 accepts for a presigned URL.
pub const MAX_EXPIRES_IN: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, StructOpt)]
#[structopt(author, about)]
pub struct Config {
    /// S3 bucket objects are stored in
    #[structopt(long, env = "S3_BUCKET")]
    pub bucket: String,
    /// Lifetime of issued URLs, in seconds
    #[structopt(
        long,
        env = "EXPIRES_IN",
        default_value = "86400",
        parse(try_from_str = parse_expires_in)
    )]
    pub expires_in: u64,
    /// GitHub repository that grants upload access, as owner/name
    #[structopt(long, env = "REPO")]
    pub repository: Repository,
    #[structopt(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,
    #[structopt(long, env = "GITHUB_API_URL", default_value = "https://api.github.com/")]
    pub github_api: Url,
}

fn parse_expires_in(s: &str) -> Result<u64, String> {
    let secs = s.parse::<u64>().map_err(|e| e.to_string())?;
    if secs == 0 || secs > MAX_EXPIRES_IN {
        return Err(format!(
            "expiry must be between 1 and {} seconds, got {}",
            MAX_EXPIRES_IN, secs
        ));
    }
    Ok(secs)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("repository must look like owner/name, got {0:?}")]
pub struct RepositoryParseError(String);

impl FromStr for Repository {
    type Err = RepositoryParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split('/').collect::<Vec<_>>().as_slice() {
            [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(RepositoryParseError(s.to_string())),
        }
    }
}
