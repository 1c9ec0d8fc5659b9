use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::checkpoint::{ProgressStore, remaining_after};
use crate::domain::Cnpj;
use crate::error::EnrichError;
use crate::pacing::{Clock, Pacer};
use crate::record::CompanyRecord;
use crate::registry::RegistryClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Fetched,
    AlreadySaved,
    Rejected,
    TransportFailed,
    Malformed,
}

impl Outcome {
    pub fn classify(err: &EnrichError) -> Self {
        match err {
            EnrichError::RegistryRejected { .. } => Outcome::Rejected,
            EnrichError::MissingField(_) => Outcome::Malformed,
            _ => Outcome::TransportFailed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub position: usize,
    pub total: usize,
    pub cnpj: String,
    pub outcome: Outcome,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    #[serde(skip)]
    pub records: Vec<CompanyRecord>,
    pub total: usize,
    pub resumed: usize,
    pub fetched: usize,
    pub rejected: usize,
    pub transport_failed: usize,
    pub malformed: usize,
    pub interrupted: bool,
    pub finished_at: String,
}

impl RunSummary {
    fn count(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Fetched => self.fetched += 1,
            Outcome::AlreadySaved => {}
            Outcome::Rejected => self.rejected += 1,
            Outcome::TransportFailed => self.transport_failed += 1,
            Outcome::Malformed => self.malformed += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.rejected + self.transport_failed + self.malformed
    }
}

pub struct Enricher<R: RegistryClient, S: ProgressStore, C: Clock> {
    client: R,
    store: S,
    pacer: Pacer<C>,
    checkpoint_every: usize,
}

impl<R: RegistryClient, S: ProgressStore, C: Clock> Enricher<R, S, C> {
    pub fn new(client: R, store: S, pacer: Pacer<C>, checkpoint_every: usize) -> Self {
        Self {
            client,
            store,
            pacer,
            checkpoint_every: checkpoint_every.max(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Saves after every `checkpoint_every` successes and at the end, but not
    /// after an interrupt. `interrupt` is only checked between identifiers.
    pub fn run(
        &mut self,
        ids: &[String],
        sink: &dyn ProgressSink,
        interrupt: &AtomicBool,
    ) -> Result<RunSummary, EnrichError> {
        let checkpoint = self.store.load();
        let remaining = remaining_after(ids, checkpoint.last_cnpj.as_deref());
        let resumed = checkpoint.last_cnpj.is_some() && remaining.len() < ids.len();

        let mut summary = RunSummary {
            total: ids.len(),
            ..RunSummary::default()
        };
        let mut records = if resumed {
            info!(
                skipped = ids.len() - remaining.len(),
                saved = checkpoint.records.len(),
                "resuming from checkpoint"
            );
            summary.resumed = checkpoint.records.len();
            checkpoint.records
        } else {
            Vec::new()
        };

        // The output may run ahead of the marker, or the marker's identifier
        // may repeat in the input; rows already saved are never fetched again.
        let saved = records
            .iter()
            .map(|record| Cnpj::normalize(&record.cnpj))
            .collect::<HashSet<_>>();

        let offset = ids.len() - remaining.len();
        for (index, raw) in remaining.iter().enumerate() {
            if interrupt.load(Ordering::SeqCst) {
                summary.interrupted = true;
                break;
            }

            let cnpj = Cnpj::from_raw(raw);
            if !cnpj.as_str().is_empty() && saved.contains(cnpj.as_str()) {
                debug!(cnpj = %cnpj, "already in saved output");
                sink.event(ProgressEvent {
                    position: offset + index + 1,
                    total: ids.len(),
                    cnpj: cnpj.as_str().to_string(),
                    outcome: Outcome::AlreadySaved,
                });
                continue;
            }
            if !cnpj.is_well_formed() {
                warn!(raw = %raw, digits = cnpj.as_str(), "cnpj is not 14 digits, querying anyway");
            }

            self.pacer.begin();
            let result = self
                .client
                .lookup(&cnpj)
                .and_then(|payload| CompanyRecord::from_payload(&payload));
            let outcome = match result {
                Ok(record) => {
                    info!(cnpj = %cnpj, nome = %record.nome, "fetched");
                    records.push(record);
                    Outcome::Fetched
                }
                Err(err) => {
                    let outcome = Outcome::classify(&err);
                    warn!(cnpj = %cnpj, ?outcome, error = %err, "skipping");
                    outcome
                }
            };
            summary.count(outcome);
            if outcome == Outcome::Fetched && summary.fetched % self.checkpoint_every == 0 {
                self.store.save(&records)?;
            }
            self.pacer.finish();

            sink.event(ProgressEvent {
                position: offset + index + 1,
                total: ids.len(),
                cnpj: cnpj.as_str().to_string(),
                outcome,
            });
        }

        if !summary.interrupted {
            self.store.save(&records)?;
        }
        summary.records = records;
        summary.finished_at = chrono::Utc::now().to_rfc3339();
        Ok(summary)
    }
}
