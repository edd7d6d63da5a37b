use chrono::{NaiveDate, NaiveDateTime};

use crate::clock::{self, DayNightRule, TimePeriod};
use crate::config::OracleConfig;
use crate::divination::{map_elements, normalize_field, ElementResult};
use crate::error::{ConfigError, OracleError};
use crate::net::analysis::AnalysisRequester;
use crate::session::{Admission, SessionId, SessionState, SessionStore, Throttle};

/// Value used for an empty or missing number field.
pub const DEFAULT_NUMBER: &str = "1";

/// First input of a 天合 reading.
pub const HEAVENLY_UNION_BASE: i64 = 12;

/// Fields of one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionForm {
    pub n1: Option<String>,
    pub n2: Option<String>,
    pub n3: Option<String>,
    pub keyword: Option<String>,
    /// Ignore the numbers and read 12 / month / day instead.
    pub heavenly_union: bool,
}

impl SubmissionForm {
    pub fn numbers(n1: &str, n2: &str, n3: &str) -> Self {
        Self {
            n1: Some(n1.to_string()),
            n2: Some(n2.to_string()),
            n3: Some(n3.to_string()),
            ..Self::default()
        }
    }

    pub fn heavenly_union() -> Self {
        Self {
            heavenly_union: true,
            ..Self::default()
        }
    }

    pub fn with_keyword(mut self, keyword: &str) -> Self {
        self.keyword = Some(keyword.to_string());
        self
    }

    /// Build from decoded form pairs. The presence of `heavenly_union`
    /// sets the flag whatever its value; unknown fields are ignored.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut form = Self::default();
        for (key, value) in pairs {
            match key {
                "n1" => form.n1 = Some(value.to_string()),
                "n2" => form.n2 = Some(value.to_string()),
                "n3" => form.n3 = Some(value.to_string()),
                "keyword" => form.keyword = Some(value.to_string()),
                "heavenly_union" => form.heavenly_union = true,
                _ => {}
            }
        }
        form
    }

    pub fn keyword(&self) -> &str {
        self.keyword.as_deref().unwrap_or("")
    }
}

fn field_or_default(value: &Option<String>) -> &str {
    match value.as_deref() {
        Some(v) if !v.is_empty() => v,
        _ => DEFAULT_NUMBER,
    }
}

/// Content of a plain page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    /// `YYYY/MM/DD`
    pub date: String,
    pub time_period: TimePeriod,
}

/// What the three mapper inputs were.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingSource {
    Numbers([u64; 3]),
    HeavenlyUnion { month: u32, day: u32 },
}

/// Analysis attached to a reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// No text-generation backend configured.
    NotRequested,
    Generated(String),
    /// The backend failed; carries the failure description.
    Unavailable(String),
}

impl AnalysisOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            AnalysisOutcome::Generated(text) => Some(text),
            _ => None,
        }
    }
}

/// Result of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub elements: ElementResult,
    pub source: ReadingSource,
    pub analysis: AnalysisOutcome,
}

/// Request boundary: Throttle → Normalize ×3 → Map → (Analysis)
pub struct OracleEngine {
    throttle: Throttle,
    day_night_rule: DayNightRule,
    analysis: Option<AnalysisRequester>,
}

impl Default for OracleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OracleEngine {
    pub fn new() -> Self {
        Self {
            throttle: Throttle::default(),
            day_night_rule: DayNightRule::default(),
            analysis: None,
        }
    }

    /// Build from start-up configuration. Analysis is wired only when a
    /// credential is present.
    pub fn from_config(config: &OracleConfig) -> Result<Self, ConfigError> {
        let mut engine = Self::new()
            .with_throttle(Throttle::new(config.submission_limit))
            .with_day_night_rule(config.day_night_rule);

        match config.api_key.as_deref() {
            Some(api_key) => {
                if let Some(requester) = build_requester(api_key, config)? {
                    engine = engine.with_analysis(requester);
                }
            }
            None => log::info!("no API key configured, analysis disabled"),
        }
        Ok(engine)
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_day_night_rule(mut self, rule: DayNightRule) -> Self {
        self.day_night_rule = rule;
        self
    }

    pub fn with_analysis(mut self, requester: AnalysisRequester) -> Self {
        self.analysis = Some(requester);
        self
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub fn analysis_enabled(&self) -> bool {
        self.analysis.is_some()
    }

    /// Date and time period for a page load at `at`.
    pub fn page_view(&self, at: NaiveDateTime) -> PageView {
        PageView {
            date: clock::format_date(at.date()),
            time_period: clock::classify_at(&at, self.day_night_rule),
        }
    }

    pub fn page_view_now(&self) -> PageView {
        self.page_view(clock::local_now())
    }

    /// Handle a submission against explicit session state.
    ///
    /// The counter is charged before the numbers are validated, so a
    /// malformed submission still uses one attempt.
    pub fn submit(
        &self,
        session: &mut SessionState,
        form: &SubmissionForm,
        today: NaiveDate,
    ) -> Result<Reading, OracleError> {
        self.admit(self.throttle.check_and_increment(session))?;
        self.read(form, today)
    }

    /// Handle a submission for a session held in `store`.
    ///
    /// The session entry is locked only for the throttle check, not for the
    /// analysis call.
    pub fn submit_in(
        &self,
        store: &SessionStore,
        id: &SessionId,
        form: &SubmissionForm,
        today: NaiveDate,
    ) -> Result<Reading, OracleError> {
        let admission = store.with_session(id, |s| self.throttle.check_and_increment(s));
        if !admission.is_allowed() {
            log::debug!("session {} is out of submissions", id.as_str());
        }
        self.admit(admission)?;
        self.read(form, today)
    }

    /// Compute a reading without touching any session.
    pub fn read(&self, form: &SubmissionForm, today: NaiveDate) -> Result<Reading, OracleError> {
        let (elements, source) = if form.heavenly_union {
            let (month, day) = clock::month_day(today);
            let elements = map_elements(HEAVENLY_UNION_BASE, month as i64, day as i64);
            (elements, ReadingSource::HeavenlyUnion { month, day })
        } else {
            let n1 = normalize_field("n1", field_or_default(&form.n1))?;
            let n2 = normalize_field("n2", field_or_default(&form.n2))?;
            let n3 = normalize_field("n3", field_or_default(&form.n3))?;
            let elements = map_elements(n1 as i64, n2 as i64, n3 as i64);
            (elements, ReadingSource::Numbers([n1, n2, n3]))
        };
        log::debug!("reading {:?}: {}", source, elements);

        let analysis = match &self.analysis {
            None => AnalysisOutcome::NotRequested,
            Some(requester) => match requester.request(&elements, form.keyword()) {
                Ok(text) => AnalysisOutcome::Generated(text),
                Err(OracleError::AnalysisUnavailable(reason)) => AnalysisOutcome::Unavailable(reason),
                Err(other) => AnalysisOutcome::Unavailable(other.to_string()),
            },
        };

        Ok(Reading {
            elements,
            source,
            analysis,
        })
    }

    fn admit(&self, admission: Admission) -> Result<(), OracleError> {
        match admission {
            Admission::Allowed => Ok(()),
            Admission::Denied => Err(OracleError::LimitExceeded {
                limit: self.throttle.limit(),
            }),
        }
    }
}

#[cfg(feature = "analysis")]
fn build_requester(
    api_key: &str,
    config: &OracleConfig,
) -> Result<Option<AnalysisRequester>, ConfigError> {
    use std::sync::Arc;

    use crate::config::ENV_ENDPOINT;
    use crate::net::chat::ChatCompletionClient;

    let client = ChatCompletionClient::new(api_key, &config.endpoint, &config.model, config.timeout)
        .map_err(|e| ConfigError::Invalid {
            var: ENV_ENDPOINT,
            value: config.endpoint.clone(),
            reason: e.to_string(),
        })?;
    log::info!("analysis via {} ({})", client.endpoint(), client.model());
    Ok(Some(AnalysisRequester::new(Arc::new(client))))
}

#[cfg(not(feature = "analysis"))]
fn build_requester(
    _api_key: &str,
    _config: &OracleConfig,
) -> Result<Option<AnalysisRequester>, ConfigError> {
    log::warn!("API key set but built without the `analysis` feature");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::divination::ELEMENTS;
    use crate::net::analysis::testing::ScriptedGenerator;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn page_view_formats_date_and_period() {
        let engine = OracleEngine::new();
        let at = day().and_hms_opt(0, 45, 0).unwrap();
        let view = engine.page_view(at);
        assert_eq!(view.date, "2024/05/17");
        assert_eq!(view.time_period.to_string(), "陰晚 子時");

        let legacy = OracleEngine::new().with_day_night_rule(DayNightRule::AlwaysDay);
        assert_eq!(legacy.page_view(at).time_period.to_string(), "陽早 子時");
    }

    #[test]
    fn submit_maps_normalized_numbers() {
        let engine = OracleEngine::new();
        let mut session = SessionState::new();

        // 23 → 5, 12 → 3, 1.9 → 1
        let form = SubmissionForm::numbers("23", "12", "1.9");
        let reading = engine.submit(&mut session, &form, day()).unwrap();

        assert_eq!(reading.source, ReadingSource::Numbers([5, 3, 1]));
        assert_eq!(reading.elements.first, ELEMENTS[4]);
        assert_eq!(reading.elements.second, ELEMENTS[6]);
        assert_eq!(reading.elements.third, ELEMENTS[6]);
        assert_eq!(reading.analysis, AnalysisOutcome::NotRequested);
        assert_eq!(session.usage_count(), 1);
    }

    #[test]
    fn empty_fields_default_to_one() {
        let engine = OracleEngine::new();
        let form = SubmissionForm::from_pairs([("n1", ""), ("n3", "")]);
        let reading = engine.read(&form, day()).unwrap();
        assert_eq!(reading.source, ReadingSource::Numbers([1, 1, 1]));
        assert_eq!(reading.elements.labels(), ["大安=1东方木青龙"; 3]);
    }

    #[test]
    fn heavenly_union_uses_month_and_day() {
        let engine = OracleEngine::new();
        let form = SubmissionForm::from_pairs([("n1", "abc"), ("heavenly_union", "")]);
        assert!(form.heavenly_union);

        let reading = engine.read(&form, day()).unwrap();
        assert_eq!(reading.source, ReadingSource::HeavenlyUnion { month: 5, day: 17 });
        // (12-1)%9=2, (12+5-2)%9=6, (12+5+17-3)%9=4
        assert_eq!(reading.elements, map_elements(12, 5, 17));
        assert_eq!(reading.elements.first, ELEMENTS[2]);
        assert_eq!(reading.elements.second, ELEMENTS[6]);
        assert_eq!(reading.elements.third, ELEMENTS[4]);
    }

    #[test]
    fn fourth_submission_is_denied() {
        let engine = OracleEngine::new();
        let mut session = SessionState::new();
        let form = SubmissionForm::numbers("1", "2", "3");

        for _ in 0..3 {
            assert!(engine.submit(&mut session, &form, day()).is_ok());
        }
        let err = engine.submit(&mut session, &form, day()).unwrap_err();
        assert_eq!(err, OracleError::LimitExceeded { limit: 3 });
        assert_eq!(session.usage_count(), 3);
    }

    #[test]
    fn invalid_input_still_consumes_an_attempt() {
        let engine = OracleEngine::new();
        let mut session = SessionState::new();

        let bad = SubmissionForm::numbers("1", "abc", "3");
        let err = engine.submit(&mut session, &bad, day()).unwrap_err();
        assert_eq!(err, OracleError::invalid_input("n2", "abc"));
        assert_eq!(session.usage_count(), 1);

        let good = SubmissionForm::numbers("1", "2", "3");
        engine.submit(&mut session, &good, day()).unwrap();
        engine.submit(&mut session, &good, day()).unwrap();
        assert!(matches!(
            engine.submit(&mut session, &good, day()),
            Err(OracleError::LimitExceeded { .. })
        ));
    }

    #[test]
    fn analysis_text_is_attached() {
        let generator = Arc::new(ScriptedGenerator::replying("宜守不宜攻。"));
        let engine = OracleEngine::new().with_analysis(AnalysisRequester::new(generator.clone()));

        let form = SubmissionForm::numbers("5", "3", "2").with_keyword("考試");
        let reading = engine.read(&form, day()).unwrap();

        assert_eq!(reading.analysis.text(), Some("宜守不宜攻。"));
        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("考試"));
        assert!(prompts[0].contains("小吉=5北方水玄武"));
    }

    #[test]
    fn analysis_failure_keeps_elements() {
        let generator = Arc::new(ScriptedGenerator::failing("401 unauthorized"));
        let engine = OracleEngine::new().with_analysis(AnalysisRequester::new(generator));

        let reading = engine.read(&SubmissionForm::numbers("5", "3", "2"), day()).unwrap();
        assert_eq!(reading.elements, map_elements(5, 3, 2));
        match reading.analysis {
            AnalysisOutcome::Unavailable(reason) => assert!(reason.contains("401 unauthorized")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn denied_submission_skips_analysis() {
        let generator = Arc::new(ScriptedGenerator::replying("ok"));
        let engine = OracleEngine::new()
            .with_throttle(Throttle::new(1))
            .with_analysis(AnalysisRequester::new(generator.clone()));
        let store = SessionStore::new();
        let id = SessionId::new("s1");
        let form = SubmissionForm::numbers("1", "1", "1");

        assert!(engine.submit_in(&store, &id, &form, day()).is_ok());
        assert!(engine.submit_in(&store, &id, &form, day()).is_err());
        assert_eq!(generator.calls(), 1);
        assert_eq!(store.get(&id).unwrap().usage_count(), 1);
    }

    #[test]
    fn from_config_without_key_has_no_analysis() {
        let config = OracleConfig::default().with_submission_limit(5);
        let engine = OracleEngine::from_config(&config).unwrap();
        assert!(!engine.analysis_enabled());
        assert_eq!(engine.throttle().limit(), 5);
    }

    #[cfg(feature = "analysis")]
    #[test]
    fn from_config_with_key_wires_analysis() {
        let config = OracleConfig::default().with_api_key("sk-test");
        let engine = OracleEngine::from_config(&config).unwrap();
        assert!(engine.analysis_enabled());

        let mut bad = config.clone();
        bad.endpoint = "::not-a-url::".to_string();
        assert!(OracleEngine::from_config(&bad).is_err());
    }
}
