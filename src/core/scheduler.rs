//! Generator execution in dependency order.
//!
//! Selected templates are grouped into waves: a template joins a wave once
//! everything it depends on has run. Templates within a wave run
//! concurrently, bounded by a semaphore, each attempt under a timeout.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use indexmap::IndexMap;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::adapters::{GenerationError, TemplateGenerator};
use crate::domain::{
    Event, EventType, Phase, PhaseStatus, TemplateId, TemplateInstance, TemplateInstances,
    TemplateParams, TemplateStrategy,
};

use super::error::TemplateGenerationError;
use super::limits::{CancellationFlag, OrchestrationLimits, RetryPolicy};
use super::registry::TemplateRegistry;

/// Selected templates grouped into dependency waves.
///
/// Within a wave, higher priority comes first and ties keep declaration order.
pub fn execution_waves(strategy: &TemplateStrategy) -> Vec<Vec<TemplateId>> {
    let order_key =
        |t: &TemplateId| (Reverse(strategy.priority_of(*t)), strategy.declaration_index(*t));

    let mut remaining = strategy.selected();
    let mut done: BTreeSet<TemplateId> = BTreeSet::new();
    let mut waves = Vec::new();

    while !remaining.is_empty() {
        let (mut ready, blocked): (Vec<TemplateId>, Vec<TemplateId>) =
            remaining.iter().copied().partition(|t| {
                strategy
                    .dependencies_of(*t)
                    .iter()
                    .all(|dep| done.contains(dep) || !remaining.contains(dep))
            });

        if ready.is_empty() {
            // cyclic leftovers run last, in priority order
            let mut rest = blocked;
            rest.sort_by_key(order_key);
            waves.push(rest);
            break;
        }

        ready.sort_by_key(order_key);
        done.extend(ready.iter().copied());
        remaining = blocked;
        waves.push(ready);
    }

    waves
}

/// Flattened execution order
pub fn instantiation_order(strategy: &TemplateStrategy) -> Vec<TemplateId> {
    execution_waves(strategy).into_iter().flatten().collect()
}

/// How one template's generation went
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateReport {
    pub template: TemplateId,
    pub attempts: u32,
    pub used_fallback: bool,
    pub duration_ms: u64,
    /// Set when the template was skipped
    pub error: Option<String>,
}

impl TemplateReport {
    pub fn is_skipped(&self) -> bool {
        self.error.is_some()
    }
}

/// Output of the instantiation phase
#[derive(Debug, Clone, Default)]
pub struct Instantiation {
    /// In instantiation order
    pub instances: TemplateInstances,
    pub reports: Vec<TemplateReport>,
    /// Degradation notes
    pub notes: Vec<String>,
    pub events: Vec<Event>,
}

impl Instantiation {
    pub fn skipped(&self) -> Vec<TemplateId> {
        self.reports
            .iter()
            .filter(|r| r.is_skipped())
            .map(|r| r.template)
            .collect()
    }
}

struct TemplateRun {
    template: TemplateId,
    result: Result<TemplateInstance, GenerationError>,
    attempts: u32,
    used_fallback: bool,
    duration_ms: u64,
    events: Vec<Event>,
}

/// Invokes generators for the selected templates
pub struct InstantiationScheduler {
    registry: Arc<TemplateRegistry>,
    workers: usize,
    generator_timeout: Duration,
    retry: RetryPolicy,
    non_critical: BTreeSet<TemplateId>,
}

impl InstantiationScheduler {
    pub fn new(registry: Arc<TemplateRegistry>, limits: &OrchestrationLimits, retry: RetryPolicy) -> Self {
        Self {
            registry,
            workers: limits.workers(),
            generator_timeout: limits.generator_timeout(),
            retry,
            non_critical: BTreeSet::new(),
        }
    }

    /// Required templates whose failure is tolerated
    pub fn with_non_critical(mut self, templates: impl IntoIterator<Item = TemplateId>) -> Self {
        self.non_critical.extend(templates);
        self
    }

    /// A critical template's failure fails the run
    pub fn is_critical(&self, strategy: &TemplateStrategy, template: TemplateId) -> bool {
        strategy.is_required(template) && !self.non_critical.contains(&template)
    }

    /// Run every selected template's generator.
    ///
    /// Fails with the first critical template that could not be generated;
    /// other failures are skipped and noted.
    pub async fn instantiate(
        &self,
        run_id: Uuid,
        strategy: &TemplateStrategy,
        records: &IndexMap<TemplateId, TemplateParams>,
        cancel: &CancellationFlag,
    ) -> Result<Instantiation, TemplateGenerationError> {
        let semaphore = Semaphore::new(self.workers);
        let mut outcome = Instantiation::default();
        let mut skipped: BTreeSet<TemplateId> = BTreeSet::new();

        for (index, wave) in execution_waves(strategy).into_iter().enumerate() {
            debug!(wave = index, templates = ?wave, "Running wave");

            for template in &wave {
                for dep in strategy.dependencies_of(*template) {
                    if skipped.contains(dep) {
                        outcome
                            .notes
                            .push(format!("{} generated without its {} dependency", template, dep));
                    }
                }
            }

            let runs = join_all(wave.iter().map(|template| {
                self.run_template(run_id, *template, records.get(template), &semaphore, cancel)
            }))
            .await;

            for run in runs {
                outcome.events.extend(run.events);
                match run.result {
                    Ok(instance) => {
                        outcome.events.push(
                            Event::new(
                                run_id,
                                Phase::Instantiation,
                                Some(run.template),
                                EventType::TemplateGenerated,
                                format!(
                                    "{} generated {} fragment(s)",
                                    run.template,
                                    instance.len()
                                ),
                                PhaseStatus::Completed,
                            )
                            .with_duration(run.duration_ms),
                        );
                        outcome.instances.insert(run.template, instance);
                        outcome.reports.push(TemplateReport {
                            template: run.template,
                            attempts: run.attempts,
                            used_fallback: run.used_fallback,
                            duration_ms: run.duration_ms,
                            error: None,
                        });
                    }
                    Err(source) => {
                        if self.is_critical(strategy, run.template) {
                            error!(template = %run.template, error = %source, "Critical template failed");
                            return Err(TemplateGenerationError {
                                template: run.template,
                                attempts: run.attempts,
                                source,
                            });
                        }

                        warn!(template = %run.template, error = %source, "Template skipped");
                        outcome.events.push(
                            Event::new(
                                run_id,
                                Phase::Instantiation,
                                Some(run.template),
                                EventType::TemplateSkipped,
                                format!("{} skipped", run.template),
                                PhaseStatus::Skipped,
                            )
                            .with_duration(run.duration_ms)
                            .with_error(source.to_string()),
                        );
                        outcome
                            .notes
                            .push(format!("{} skipped: {}", run.template, source));
                        outcome.reports.push(TemplateReport {
                            template: run.template,
                            attempts: run.attempts,
                            used_fallback: run.used_fallback,
                            duration_ms: run.duration_ms,
                            error: Some(source.to_string()),
                        });
                        skipped.insert(run.template);
                    }
                }
            }
        }

        Ok(outcome)
    }

    async fn run_template(
        &self,
        run_id: Uuid,
        template: TemplateId,
        record: Option<&TemplateParams>,
        semaphore: &Semaphore,
        cancel: &CancellationFlag,
    ) -> TemplateRun {
        let started = Instant::now();
        let mut run = TemplateRun {
            template,
            result: Err(GenerationError::Failed(format!(
                "no generator registered for {}",
                template
            ))),
            attempts: 0,
            used_fallback: false,
            duration_ms: 0,
            events: Vec::new(),
        };

        let Some(record) = record else {
            run.result = Err(GenerationError::InvalidParams(format!(
                "no parameters synthesized for {}",
                template
            )));
            return run;
        };

        let _permit = match semaphore.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                run.result = Err(GenerationError::Aborted(e.to_string()));
                return run;
            }
        };

        if let Some(generator) = self.registry.get(template) {
            let (result, attempts) = self
                .attempt(run_id, generator.as_ref(), record, cancel, &mut run.events)
                .await;
            run.result = result;
            run.attempts = attempts;
        }

        if run.result.is_err() {
            if let Some(fallback) = self.registry.fallback(template) {
                let primary_error = run
                    .result
                    .as_ref()
                    .err()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                let (result, attempts) = self
                    .attempt(run_id, fallback.as_ref(), record, cancel, &mut run.events)
                    .await;
                run.attempts += attempts;
                if result.is_ok() {
                    run.used_fallback = true;
                    run.events.push(
                        Event::new(
                            run_id,
                            Phase::Instantiation,
                            Some(template),
                            EventType::FallbackUsed,
                            format!("{} generated by fallback {}", template, fallback.name()),
                            PhaseStatus::Completed,
                        )
                        .with_error(primary_error),
                    );
                }
                run.result = result;
            }
        }

        run.duration_ms = started.elapsed().as_millis() as u64;
        run
    }

    /// Attempt loop for one generator: timeout per attempt, backoff between
    async fn attempt(
        &self,
        run_id: Uuid,
        generator: &dyn TemplateGenerator,
        record: &TemplateParams,
        cancel: &CancellationFlag,
        events: &mut Vec<Event>,
    ) -> (Result<TemplateInstance, GenerationError>, u32) {
        let limit_ms = self.generator_timeout.as_millis() as u64;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let result = match tokio::time::timeout(self.generator_timeout, generator.generate(record)).await {
                Ok(result) => result,
                Err(_) => Err(GenerationError::TimedOut { limit_ms }),
            };

            match result {
                Ok(instance) => return (Ok(instance), attempt),
                Err(e) => {
                    if cancel.is_cancelled() {
                        return (Err(GenerationError::Aborted("run cancelled".to_string())), attempt);
                    }
                    if !e.is_retryable() || !self.retry.should_retry(attempt) {
                        return (Err(e), attempt);
                    }

                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        generator = generator.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Generator failed, retrying"
                    );
                    events.push(
                        Event::new(
                            run_id,
                            Phase::Instantiation,
                            Some(record.template),
                            EventType::TemplateRetrying,
                            format!("{} attempt {} failed, retrying in {:?}", generator.name(), attempt, delay),
                            PhaseStatus::Running,
                        )
                        .with_error(e.to_string()),
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ReferenceGenerator;
    use crate::core::test_support::{fixture, japanese_wedding};
    use crate::domain::{EventKind, SceneFragment};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Failing(TemplateId);

    #[async_trait]
    impl TemplateGenerator for Failing {
        fn template(&self) -> TemplateId {
            self.0
        }

        async fn generate(&self, _params: &TemplateParams) -> Result<TemplateInstance, GenerationError> {
            Err(GenerationError::Failed("out of stock".to_string()))
        }
    }

    struct Slow(TemplateId);

    #[async_trait]
    impl TemplateGenerator for Slow {
        fn template(&self) -> TemplateId {
            self.0
        }

        async fn generate(&self, _params: &TemplateParams) -> Result<TemplateInstance, GenerationError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(TemplateInstance::Many(Vec::new()))
        }
    }

    /// Fails until the given attempt
    struct Flaky {
        template: TemplateId,
        succeed_on: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl TemplateGenerator for Flaky {
        fn template(&self) -> TemplateId {
            self.template
        }

        async fn generate(&self, _params: &TemplateParams) -> Result<TemplateInstance, GenerationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call < self.succeed_on {
                Err(GenerationError::Failed("flaky".to_string()))
            } else {
                Ok(TemplateInstance::Single(SceneFragment::new("ok")))
            }
        }
    }

    fn registry_with(overrides: Vec<Arc<dyn TemplateGenerator>>) -> Arc<TemplateRegistry> {
        let mut registry = TemplateRegistry::with_reference_generators();
        for generator in overrides {
            registry.register(generator);
        }
        Arc::new(registry)
    }

    fn scheduler(registry: Arc<TemplateRegistry>, retry: RetryPolicy) -> InstantiationScheduler {
        let limits = OrchestrationLimits {
            generator_timeout_ms: 50,
            ..Default::default()
        };
        InstantiationScheduler::new(registry, &limits, retry)
    }

    #[test]
    fn test_waves_respect_dependencies() {
        let f = fixture(japanese_wedding());
        let order = instantiation_order(&f.strategy);
        let pos = |t| order.iter().position(|x| *x == t).unwrap();
        assert!(pos(TemplateId::Table) < pos(TemplateId::Chair));
        assert!(pos(TemplateId::Stage) < pos(TemplateId::Lighting));
        assert_eq!(order.len(), f.strategy.selected().len());
    }

    #[test]
    fn test_wave_ties_break_by_priority_then_declaration() {
        let strategy = TemplateStrategy {
            required: vec![TemplateId::Chair, TemplateId::Table, TemplateId::Floral],
            optional: vec![TemplateId::Landscape],
            priority: [
                (TemplateId::Chair, 60),
                (TemplateId::Table, 60),
                (TemplateId::Floral, 70),
                (TemplateId::Landscape, 60),
            ]
            .into_iter()
            .collect(),
            dependencies: [(TemplateId::Chair, vec![TemplateId::Table])].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(
            execution_waves(&strategy),
            vec![
                vec![TemplateId::Floral, TemplateId::Table, TemplateId::Landscape],
                vec![TemplateId::Chair]
            ]
        );
    }

    #[tokio::test]
    async fn test_reference_generators_fill_every_template() {
        let f = fixture(japanese_wedding());
        let outcome = scheduler(registry_with(vec![]), RetryPolicy::none())
            .instantiate(Uuid::new_v4(), &f.strategy, &f.records, &CancellationFlag::new())
            .await
            .unwrap();
        assert_eq!(outcome.instances.len(), f.strategy.selected().len());
        assert!(outcome.skipped().is_empty());
        assert!(outcome.notes.is_empty());
        let order: Vec<_> = outcome.instances.templates().collect();
        assert_eq!(order, instantiation_order(&f.strategy));
    }

    #[tokio::test]
    async fn test_critical_failure_is_fatal() {
        let f = fixture(japanese_wedding());
        let err = scheduler(
            registry_with(vec![Arc::new(Failing(TemplateId::Table))]),
            RetryPolicy::none(),
        )
        .instantiate(Uuid::new_v4(), &f.strategy, &f.records, &CancellationFlag::new())
        .await
        .unwrap_err();
        assert_eq!(err.template, TemplateId::Table);
        assert_eq!(err.attempts, 1);
    }

    #[tokio::test]
    async fn test_non_critical_failure_is_skipped_with_note() {
        let f = fixture(japanese_wedding());
        let outcome = scheduler(
            registry_with(vec![Arc::new(Failing(TemplateId::Table))]),
            RetryPolicy::none(),
        )
        .with_non_critical([TemplateId::Table])
        .instantiate(Uuid::new_v4(), &f.strategy, &f.records, &CancellationFlag::new())
        .await
        .unwrap();

        assert!(!outcome.instances.contains(TemplateId::Table));
        assert!(outcome.instances.contains(TemplateId::Chair));
        assert_eq!(outcome.skipped(), vec![TemplateId::Table]);
        assert!(outcome.notes.iter().any(|n| n.contains("without its table dependency")));
        assert!(outcome
            .events
            .iter()
            .any(|e| e.event_type == EventType::TemplateSkipped && e.template == Some(TemplateId::Table)));
    }

    #[tokio::test]
    async fn test_timeout_then_fallback() {
        let f = fixture(japanese_wedding());
        let mut registry = TemplateRegistry::with_reference_generators();
        registry
            .register(Arc::new(Slow(TemplateId::Floral)))
            .register_fallback(Arc::new(ReferenceGenerator::new(TemplateId::Floral)));

        let outcome = scheduler(Arc::new(registry), RetryPolicy::none())
            .instantiate(Uuid::new_v4(), &f.strategy, &f.records, &CancellationFlag::new())
            .await
            .unwrap();

        let report = outcome
            .reports
            .iter()
            .find(|r| r.template == TemplateId::Floral)
            .unwrap();
        assert!(report.used_fallback);
        assert_eq!(report.attempts, 2);
        assert!(outcome.instances.contains(TemplateId::Floral));
        assert!(outcome
            .events
            .iter()
            .any(|e| e.event_type == EventType::FallbackUsed));
    }

    #[tokio::test]
    async fn test_retry_recovers_flaky_generator() {
        let f = fixture(japanese_wedding());
        let retry = RetryPolicy {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
        };
        let outcome = scheduler(
            registry_with(vec![Arc::new(Flaky {
                template: TemplateId::Stage,
                succeed_on: 3,
                calls: AtomicU32::new(0),
            })]),
            retry,
        )
        .instantiate(Uuid::new_v4(), &f.strategy, &f.records, &CancellationFlag::new())
        .await
        .unwrap();

        let report = outcome
            .reports
            .iter()
            .find(|r| r.template == TemplateId::Stage)
            .unwrap();
        assert_eq!(report.attempts, 3);
        assert!(!report.used_fallback);
        let retries = outcome
            .events
            .iter()
            .filter(|e| e.event_type == EventType::TemplateRetrying)
            .count();
        assert_eq!(retries, 2);
    }

    #[tokio::test]
    async fn test_optional_template_never_fatal() {
        let params = crate::domain::EventOrchestrationParameters::new(
            EventKind::Wedding,
            crate::domain::Culture::Modern,
            60,
            80_000.0,
        );
        let f = fixture(params);
        assert!(f.strategy.optional.contains(&TemplateId::Interactive));

        let outcome = scheduler(
            registry_with(vec![Arc::new(Failing(TemplateId::Interactive))]),
            RetryPolicy::none(),
        )
        .instantiate(Uuid::new_v4(), &f.strategy, &f.records, &CancellationFlag::new())
        .await
        .unwrap();
        assert_eq!(outcome.skipped(), vec![TemplateId::Interactive]);
    }
}
