//! Agent ingestion
//!
//! Each call validates the payload, resolves the target project through the
//! parent id it carries, requires write access there, and only then persists.
//! A rejected call leaves nothing behind.

use crate::auth::{AccessControl, Action, Principal, Resource};
use crate::db::models::{Emission, Experiment, Run};
use crate::db::Repository;
use crate::errors::Result;
use crate::metrics;
use crate::schemas::{EmissionCreate, ExperimentCreate, RunCreate};
use tracing::info;
use validator::Validate;

#[derive(Clone)]
pub struct Ingestor {
    repo: Repository,
    access: AccessControl,
}

impl Ingestor {
    pub fn new(repo: Repository, access: AccessControl) -> Self {
        Self { repo, access }
    }

    pub async fn create_experiment(&self, principal: &Principal, payload: ExperimentCreate) -> Result<Experiment> {
        payload.validate()?;
        self.access
            .authorize(principal, Action::Write, Resource::Project(payload.project_id))
            .await?;

        let experiment = self.repo.create_experiment(payload).await?;
        metrics::record_ingestion("experiment");
        info!(
            experiment_id = %experiment.id,
            project_id = %experiment.project_id,
            principal = principal.kind(),
            "Experiment ingested"
        );
        Ok(experiment)
    }

    pub async fn create_run(&self, principal: &Principal, payload: RunCreate) -> Result<Run> {
        payload.validate()?;
        self.access
            .authorize(principal, Action::Write, Resource::Experiment(payload.experiment_id))
            .await?;

        let run = self.repo.create_run(payload).await?;
        metrics::record_ingestion("run");
        info!(
            run_id = %run.id,
            experiment_id = %run.experiment_id,
            principal = principal.kind(),
            "Run ingested"
        );
        Ok(run)
    }

    pub async fn create_emission(&self, principal: &Principal, payload: EmissionCreate) -> Result<Emission> {
        payload.validate()?;
        self.access
            .authorize(principal, Action::Write, Resource::Run(payload.run_id))
            .await?;

        let emission = self.repo.create_emission(payload).await?;
        metrics::record_ingestion("emission");
        info!(
            emission_id = %emission.id,
            run_id = %emission.run_id,
            principal = principal.kind(),
            "Emission ingested"
        );
        Ok(emission)
    }
}
