use cosmwasm_std::{Event, Storage};

use crate::error::ContractError;
use crate::executor::{ComponentExecutor, Execution};
use crate::host::HeightClock;
use crate::repository::WillRepository;
use crate::state::WillStatus;

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedWill {
    pub will_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentFailure {
    pub will_id: String,
    pub component_id: String,
    pub reason: String,
}

impl ComponentFailure {
    pub fn event(&self) -> Event {
        Event::new("will_component_failed")
            .add_attribute("will_id", &self.will_id)
            .add_attribute("component_id", &self.component_id)
            .add_attribute("reason", &self.reason)
    }
}

/// A component whose effect was handed to the host and has not reported
/// back yet.
#[derive(Debug, Clone, PartialEq)]
pub struct InFlight {
    pub reply_id: u64,
    pub will_id: String,
    pub component_id: String,
}

/// What one block's run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockReport {
    pub height: u64,
    /// Wills moved to `Expired`, in processing order
    pub processed: Vec<String>,
    pub skipped_wills: Vec<SkippedWill>,
    /// Components left unexecuted
    pub failed_components: Vec<ComponentFailure>,
    /// Components still `Pending` until their reply arrives
    pub in_flight: Vec<InFlight>,
    /// Set when the height bucket itself could not be read
    pub index_error: Option<String>,
    pub events: Vec<Event>,
}

impl BlockReport {
    /// One event per skipped will and per unexecuted component, plus one
    /// for an unreadable height bucket.
    pub fn failure_events(&self) -> Vec<Event> {
        let index = self.index_error.iter().map(|reason| {
            Event::new("will_index_unreadable")
                .add_attribute("height", self.height.to_string())
                .add_attribute("reason", reason)
        });
        let skipped = self.skipped_wills.iter().map(|s| {
            Event::new("will_skipped")
                .add_attribute("will_id", &s.will_id)
                .add_attribute("reason", &s.reason)
        });
        let failed = self.failed_components.iter().map(ComponentFailure::event);
        index.chain(skipped).chain(failed).collect()
    }
}

/// Drives every will maturing at the current height through its components.
pub struct MaturityScheduler {
    repo: WillRepository,
}

impl MaturityScheduler {
    pub fn new(repo: WillRepository) -> Self {
        MaturityScheduler { repo }
    }

    /// Process the height bucket for `clock.current_height()`.
    ///
    /// Wills run in index order and components in stored order. A failing
    /// component is recorded and left as it was; a will that cannot be read
    /// or is no longer `Live` is recorded and skipped. Every processed will
    /// is persisted as `Expired` so it never runs again. An unreadable
    /// height bucket is recorded in the report and nothing runs.
    pub fn run(
        &self,
        store: &mut dyn Storage,
        clock: &dyn HeightClock,
        executor: &ComponentExecutor,
    ) -> Result<BlockReport, ContractError> {
        let height = clock.current_height();
        let mut report = BlockReport {
            height,
            ..BlockReport::default()
        };

        let will_ids = match self.repo.index_by_height(store, height) {
            Ok(ids) => ids,
            Err(err) => {
                report.index_error = Some(err.to_string());
                return Ok(report);
            }
        };

        for will_id in will_ids {
            let mut will = match self.repo.get(store, &will_id) {
                Ok(will) => will,
                Err(err) => {
                    report.skipped_wills.push(SkippedWill {
                        will_id,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            if will.status != WillStatus::Live {
                report.skipped_wills.push(SkippedWill {
                    will_id,
                    reason: "will is not live".to_string(),
                });
                continue;
            }

            for index in 0..will.components.len() {
                let component = &will.components[index];
                let target = component.kind.matured_status();
                if !component.status.can_advance_to(&target) {
                    report.failed_components.push(ComponentFailure {
                        will_id: will.id.clone(),
                        component_id: component.id.clone(),
                        reason: format!("already {}", component.status.as_str()),
                    });
                    continue;
                }

                match executor.execute(&will, component) {
                    Ok(Execution::Settled { status, event }) => {
                        will.components[index].advance(status)?;
                        report.events.extend(event);
                    }
                    Ok(Execution::InFlight { reply_id }) => report.in_flight.push(InFlight {
                        reply_id,
                        will_id: will.id.clone(),
                        component_id: component.id.clone(),
                    }),
                    Err(err) => report.failed_components.push(ComponentFailure {
                        will_id: will.id.clone(),
                        component_id: component.id.clone(),
                        reason: err.to_string(),
                    }),
                }
            }

            will.status = WillStatus::Expired;
            self.repo.put(store, &will)?;
            report.processed.push(will.id);
        }

        Ok(report)
    }
}
