//! Pipeline orchestration: readiness wait, model provisioning, analysis

use std::thread;

use crate::client::InferenceService;
use crate::config::Config;
use crate::error::PipelineError;
use crate::stats::LogStats;
use crate::template::PromptTemplate;

/// Pipeline stages in execution order. `Failed` is terminal and reachable
/// from every non-terminal stage; earlier stages are never reattempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Connecting,
    Ready,
    Provisioning,
    Provisioned,
    Analyzing,
    Done,
    Failed,
}

/// Wait until the service answers the readiness probe.
///
/// Transient connection failures back off `backoff_base * 2^attempt` and
/// retry, up to `max_retries` attempts. Any other probe failure is fatal
/// immediately. No sleep after the final failed attempt, so total blocking
/// is bounded by the retry budget.
pub fn wait_for_server<S: InferenceService>(
    service: &S,
    config: &Config,
) -> Result<(), PipelineError> {
    log::info!("Connecting to inference server at {}", config.endpoint);
    for attempt in 0..config.max_retries {
        match service.probe() {
            Ok(()) => {
                log::info!("Connected to inference server");
                return Ok(());
            }
            Err(err) if err.is_transient() => {
                log::warn!(
                    "Connection attempt {}/{} failed: {}",
                    attempt + 1,
                    config.max_retries,
                    err
                );
                if attempt + 1 < config.max_retries {
                    thread::sleep(config.backoff_base * 2u32.saturating_pow(attempt));
                }
            }
            Err(err) => return Err(PipelineError::MalformedResponse(err)),
        }
    }
    Err(PipelineError::ServiceUnavailable {
        attempts: config.max_retries,
    })
}

/// Ensure `model` is present on the service, pulling it if absent.
///
/// Idempotent: a model already in the service's list is a no-op. An empty
/// list simply means the model is absent and gets pulled. Failures are not
/// retried here.
pub fn ensure_model<S: InferenceService>(service: &S, model: &str) -> Result<(), PipelineError> {
    log::info!("Checking for model {}", model);
    let models = service
        .list_models()
        .map_err(|source| PipelineError::Provisioning {
            model: model.to_string(),
            source,
        })?;

    if models.iter().any(|m| m == model) {
        log::info!("Model {} already available", model);
        return Ok(());
    }

    log::info!("Downloading model {}", model);
    service
        .pull_model(model)
        .map_err(|source| PipelineError::Provisioning {
            model: model.to_string(),
            source,
        })?;
    log::info!("Model {} downloaded", model);
    Ok(())
}

/// Compose the prompt from raw lines plus derived statistics and run a
/// non-streaming generation, returning the text of the summary.
pub fn analyze_logs<S, L>(
    service: &S,
    config: &Config,
    template: &PromptTemplate,
    lines: &[L],
) -> Result<String, PipelineError>
where
    S: InferenceService,
    L: AsRef<str>,
{
    log::info!("Preparing analysis of {} log lines", lines.len());
    let stats = LogStats::summarize(lines);
    let joined: Vec<&str> = lines.iter().map(|l| l.as_ref()).collect();
    let block = format!("{}\n\nStatistics:\n{}", joined.join("\n"), stats);
    let prompt = template.render(&block)?;

    log::info!("Generating analysis with model {}", config.model);
    service
        .generate(&config.model, &prompt)
        .map_err(PipelineError::Analysis)
}

/// Drives the stages in order; the first unrecovered error is terminal.
pub struct Pipeline<S> {
    config: Config,
    service: S,
    template: PromptTemplate,
    stage: Stage,
}

impl<S: InferenceService> Pipeline<S> {
    pub fn new(config: Config, service: S, template: PromptTemplate) -> Self {
        Self {
            config,
            service,
            template,
            stage: Stage::Init,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Run readiness, provisioning, and analysis in order. A failure at any
    /// stage leaves the pipeline in `Failed`; earlier stages never rerun.
    pub fn run<L: AsRef<str>>(&mut self, lines: &[L]) -> Result<String, PipelineError> {
        let result = self.run_stages(lines);
        if result.is_err() {
            self.advance(Stage::Failed);
        }
        result
    }

    fn run_stages<L: AsRef<str>>(&mut self, lines: &[L]) -> Result<String, PipelineError> {
        self.advance(Stage::Connecting);
        wait_for_server(&self.service, &self.config)?;
        self.advance(Stage::Ready);

        self.advance(Stage::Provisioning);
        ensure_model(&self.service, &self.config.model)?;
        self.advance(Stage::Provisioned);

        self.advance(Stage::Analyzing);
        let text = analyze_logs(&self.service, &self.config, &self.template, lines)?;
        self.advance(Stage::Done);
        Ok(text)
    }

    fn advance(&mut self, stage: Stage) {
        log::info!("Pipeline stage: {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use std::cell::{Cell, RefCell};
    use std::time::Duration;

    /// Scripted service double with call counters.
    struct MockService {
        probe_failures: u32,
        probe_fatal: bool,
        probe_calls: Cell<u32>,
        models: Vec<String>,
        list_fails: bool,
        pull_fails: bool,
        pull_calls: Cell<u32>,
        generate_fails: bool,
        last_prompt: RefCell<Option<String>>,
    }

    impl MockService {
        fn ready() -> Self {
            Self {
                probe_failures: 0,
                probe_fatal: false,
                probe_calls: Cell::new(0),
                models: vec!["llama3.1:8b".to_string()],
                list_fails: false,
                pull_fails: false,
                pull_calls: Cell::new(0),
                generate_fails: false,
                last_prompt: RefCell::new(None),
            }
        }
    }

    impl InferenceService for MockService {
        fn probe(&self) -> Result<(), ClientError> {
            let attempt = self.probe_calls.get();
            self.probe_calls.set(attempt + 1);
            if self.probe_fatal {
                return Err(ClientError::Decode("not json".to_string()));
            }
            if attempt < self.probe_failures {
                return Err(ClientError::Connection("refused".to_string()));
            }
            Ok(())
        }

        fn list_models(&self) -> Result<Vec<String>, ClientError> {
            if self.list_fails {
                return Err(ClientError::Connection("refused".to_string()));
            }
            Ok(self.models.clone())
        }

        fn pull_model(&self, _name: &str) -> Result<(), ClientError> {
            self.pull_calls.set(self.pull_calls.get() + 1);
            if self.pull_fails {
                return Err(ClientError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
            }
            Ok(())
        }

        fn generate(&self, _model: &str, prompt: &str) -> Result<String, ClientError> {
            if self.generate_fails {
                return Err(ClientError::Connection("reset".to_string()));
            }
            *self.last_prompt.borrow_mut() = Some(prompt.to_string());
            Ok("Summary: one error, all else nominal.".to_string())
        }
    }

    fn test_config() -> Config {
        Config {
            backoff_base: Duration::ZERO,
            ..Config::default()
        }
    }

    fn test_template() -> PromptTemplate {
        PromptTemplate::new("Logs:\n{logs}").unwrap()
    }

    #[test]
    fn wait_succeeds_on_first_probe() {
        let service = MockService::ready();
        wait_for_server(&service, &test_config()).unwrap();
        assert_eq!(service.probe_calls.get(), 1);
    }

    #[test]
    fn wait_retries_transient_failures_then_succeeds() {
        let service = MockService {
            probe_failures: 2,
            ..MockService::ready()
        };
        wait_for_server(&service, &test_config()).unwrap();
        assert_eq!(service.probe_calls.get(), 3);
    }

    #[test]
    fn wait_exhausts_budget_after_exactly_max_retries_attempts() {
        let service = MockService {
            probe_failures: u32::MAX,
            ..MockService::ready()
        };
        let config = Config {
            max_retries: 4,
            ..test_config()
        };

        let err = wait_for_server(&service, &config).unwrap_err();
        assert!(matches!(err, PipelineError::ServiceUnavailable { attempts: 4 }));
        assert_eq!(service.probe_calls.get(), 4);
    }

    #[test]
    fn wait_does_not_retry_non_transient_probe_errors() {
        let service = MockService {
            probe_fatal: true,
            ..MockService::ready()
        };

        let err = wait_for_server(&service, &test_config()).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));
        assert_eq!(service.probe_calls.get(), 1);
    }

    #[test]
    fn ensure_model_skips_pull_when_present() {
        let service = MockService::ready();
        ensure_model(&service, "llama3.1:8b").unwrap();
        assert_eq!(service.pull_calls.get(), 0);
    }

    #[test]
    fn ensure_model_pulls_absent_model_once() {
        let service = MockService {
            models: vec!["mistral:7b".to_string()],
            ..MockService::ready()
        };
        ensure_model(&service, "llama3.1:8b").unwrap();
        assert_eq!(service.pull_calls.get(), 1);
    }

    #[test]
    fn ensure_model_treats_empty_list_as_absent() {
        let service = MockService {
            models: vec![],
            ..MockService::ready()
        };
        ensure_model(&service, "llama3.1:8b").unwrap();
        assert_eq!(service.pull_calls.get(), 1);
    }

    #[test]
    fn ensure_model_wraps_list_failure() {
        let service = MockService {
            list_fails: true,
            ..MockService::ready()
        };
        let err = ensure_model(&service, "llama3.1:8b").unwrap_err();
        assert!(matches!(err, PipelineError::Provisioning { .. }));
        assert_eq!(service.pull_calls.get(), 0);
    }

    #[test]
    fn ensure_model_wraps_pull_failure() {
        let service = MockService {
            models: vec![],
            pull_fails: true,
            ..MockService::ready()
        };
        let err = ensure_model(&service, "llama3.1:8b").unwrap_err();
        assert!(matches!(err, PipelineError::Provisioning { .. }));
    }

    #[test]
    fn analyze_composes_lines_and_stats_into_prompt() {
        let service = MockService::ready();
        let lines = [
            "2024-01-20 10:15:23 INFO Server started",
            "2024-01-20 10:15:24 ERROR Database connection failed",
        ];

        analyze_logs(&service, &test_config(), &test_template(), &lines).unwrap();

        let prompt = service.last_prompt.borrow().clone().unwrap();
        assert!(prompt.starts_with("Logs:\n"));
        assert!(prompt.contains("2024-01-20 10:15:23 INFO Server started"));
        assert!(prompt.contains("2024-01-20 10:15:24 ERROR Database connection failed"));
        assert!(prompt.contains("Total lines: 2"));
        assert!(prompt.contains("Errors: 1"));
        assert!(prompt.contains("Warnings: 0"));
        assert!(prompt.contains("Info: 1"));
        assert!(!prompt.contains("{logs}"));
    }

    #[test]
    fn analyze_wraps_generation_failure() {
        let service = MockService {
            generate_fails: true,
            ..MockService::ready()
        };
        let err =
            analyze_logs(&service, &test_config(), &test_template(), &["a line"]).unwrap_err();
        assert!(matches!(err, PipelineError::Analysis(_)));
    }

    #[test]
    fn pipeline_runs_to_done() {
        let mut pipeline =
            Pipeline::new(test_config(), MockService::ready(), test_template());
        let text = pipeline.run(&["INFO all good"]).unwrap();

        assert!(!text.is_empty());
        assert_eq!(pipeline.stage(), Stage::Done);
    }

    #[test]
    fn pipeline_fails_terminally_when_server_never_answers() {
        let service = MockService {
            probe_failures: u32::MAX,
            ..MockService::ready()
        };
        let mut pipeline = Pipeline::new(test_config(), service, test_template());

        let err = pipeline.run(&["INFO all good"]).unwrap_err();
        assert!(matches!(err, PipelineError::ServiceUnavailable { .. }));
        assert_eq!(pipeline.stage(), Stage::Failed);
    }

    #[test]
    fn pipeline_fails_terminally_on_provisioning_error() {
        let service = MockService {
            list_fails: true,
            ..MockService::ready()
        };
        let mut pipeline = Pipeline::new(test_config(), service, test_template());

        let err = pipeline.run(&["INFO all good"]).unwrap_err();
        assert!(matches!(err, PipelineError::Provisioning { .. }));
        assert_eq!(pipeline.stage(), Stage::Failed);
    }
}
