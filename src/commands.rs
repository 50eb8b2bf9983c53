//! Command implementations.
//!
//! [`Offline`] commands only need the provider registry; [`Online`] ones
//! also talk to GitHub. Records are printed with sensitive attributes
//! redacted, but written to state files in full.

use std::path::Path;

use anyhow::{Context, Result};
use hubform_config::persistence::{read_json_file, write_json_file};
use hubform_github::{GitHubClient, Provider};
use hubform_protocol::{Attributes, PlanAction, ReadOutcome, Record};
use serde::Serialize;
use tracing::{debug, info};

fn read_attributes(path: &Path) -> Result<Attributes> {
    read_json_file(path).with_context(|| format!("reading attributes from {}", path.display()))
}

fn read_state(path: &Path) -> Result<Record> {
    read_json_file(path).with_context(|| format!("reading state from {}", path.display()))
}

fn write_state(path: &Path, record: &Record) -> Result<()> {
    write_json_file(path, record).with_context(|| format!("writing state to {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Commands that never contact GitHub.
#[derive(Debug, Clone, Copy)]
pub struct Offline<'a> {
    pub provider: &'a Provider,
}

impl Offline<'_> {
    pub fn types(&self) -> Result<()> {
        println!("resources:");
        for name in self.provider.resource_types() {
            println!("  {name}");
        }
        println!("data sources:");
        for name in self.provider.data_source_types() {
            println!("  {name}");
        }
        Ok(())
    }

    pub fn schema(&self, type_name: &str) -> Result<()> {
        print_json(self.provider.schema(type_name)?)
    }

    pub fn validate(&self, type_name: &str, config: &Path) -> Result<()> {
        let attributes = read_attributes(config)?;
        if self.provider.resource(type_name).is_ok() {
            self.provider.validate_resource(type_name, &attributes)?;
        } else {
            self.provider.validate_data_source(type_name, &attributes)?;
        }
        println!("{type_name}: configuration is valid");
        Ok(())
    }

    pub fn plan(&self, type_name: &str, config: &Path, state: Option<&Path>) -> Result<()> {
        let attributes = read_attributes(config)?;
        let prior = match state {
            Some(path) if path.exists() => Some(read_state(path)?),
            _ => None,
        };
        let action = self.provider.plan(type_name, prior.as_ref(), &attributes)?;
        print_json(&action)
    }
}

/// Commands that read or change remote objects.
#[derive(Debug, Clone, Copy)]
pub struct Online<'a> {
    pub provider: &'a Provider,
    pub client: &'a GitHubClient,
}

impl Online<'_> {
    fn print_record(&self, type_name: &str, record: &Record) -> Result<()> {
        let schema = self.provider.schema(type_name)?;
        print_json(&record.redacted(schema))
    }

    pub async fn apply(&self, type_name: &str, config: &Path, state: &Path) -> Result<()> {
        let attributes = read_attributes(config)?;
        let mut prior = if state.exists() { Some(read_state(state)?) } else { None };

        // Plan against what exists now, not what was last written.
        if let Some(record) = prior.as_mut() {
            self.provider.read(self.client, type_name, record).await?;
        }

        let record = match (self.provider.plan(type_name, prior.as_ref(), &attributes)?, prior) {
            (PlanAction::NoOp, Some(record)) => {
                info!("no changes");
                record
            }
            (PlanAction::Replace { attributes: changed }, Some(record)) => {
                info!(?changed, "replacing");
                self.provider.delete(self.client, type_name, &record).await?;
                self.provider.create(self.client, type_name, &attributes).await?
            }
            _ => self.provider.create(self.client, type_name, &attributes).await?,
        };

        write_state(state, &record)?;
        self.print_record(type_name, &record)
    }

    pub async fn refresh(&self, type_name: &str, state: &Path) -> Result<()> {
        let mut record = read_state(state)?;
        let outcome = self.provider.read(self.client, type_name, &mut record).await?;
        write_state(state, &record)?;
        match outcome {
            ReadOutcome::Refreshed => self.print_record(type_name, &record),
            ReadOutcome::Removed => {
                println!("{type_name}: remote object no longer exists");
                Ok(())
            }
            ReadOutcome::Drifted => {
                println!("{type_name}: remote object changed outside of hubform and will be recreated");
                Ok(())
            }
        }
    }

    pub async fn destroy(&self, type_name: &str, state: &Path) -> Result<()> {
        let record = read_state(state)?;
        self.provider.delete(self.client, type_name, &record).await?;
        std::fs::remove_file(state).with_context(|| format!("removing {}", state.display()))?;
        debug!(state = %state.display(), "removed state file");
        println!("{type_name}: destroyed");
        Ok(())
    }

    pub async fn import(&self, type_name: &str, import_id: &str, state: &Path) -> Result<()> {
        let record = self.provider.import(self.client, type_name, import_id).await?;
        write_state(state, &record)?;
        self.print_record(type_name, &record)
    }

    pub async fn check(&self) -> Result<()> {
        if self.client.validate_token().await? {
            println!("credentials accepted by {}", self.client.base_url());
        } else {
            println!("no credentials configured, requests are unauthenticated");
        }
        Ok(())
    }

    pub async fn read_data(&self, type_name: &str, config: &Path) -> Result<()> {
        let attributes = read_attributes(config)?;
        let record = self.provider.read_data(self.client, type_name, &attributes).await?;
        self.print_record(type_name, &record)
    }
}
