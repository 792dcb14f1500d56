mod common;

use std::sync::Arc;
use std::time::Duration;

use auto_apply::infrastructure::{ElementKind, Locator};
use auto_apply::models::{ApplicationMethod, SemanticField};
use auto_apply::services::{FieldLocator, LocatorTimeouts, NoDelay};
use auto_apply::workflow::FlowSettings;
use auto_apply::{ApplicantProfile, ApplicationFlow, ApplicationStatus, AttemptState, JobPosting, StrategyRegistry};
use common::{FakeElement, FakePageSource, FakeSite};

const EMAIL: &str = r#"input[type="email"]"#;
const PHONE: &str = r#"input[type="tel"]"#;
const SUBMIT: &str = r#"button[type="submit"]"#;

fn flow(source: &FakePageSource) -> ApplicationFlow<&FakePageSource, NoDelay> {
    flow_with(source, FlowSettings::immediate())
}

fn flow_with(
    source: &FakePageSource,
    settings: FlowSettings,
) -> ApplicationFlow<&FakePageSource, NoDelay> {
    ApplicationFlow::new(
        source,
        Arc::new(StrategyRegistry::builtin()),
        FieldLocator::new(LocatorTimeouts::immediate()),
        NoDelay,
        settings,
    )
}

fn job(platform: &str) -> JobPosting {
    JobPosting::new("1", "https://example.test/job/1", platform)
}

/// 申请按钮 + 邮箱输入框 + 提交按钮
fn simple_form() -> FakeSite {
    FakeSite::new()
        .with_apply(Locator::text("button", "Apply"))
        .with(Locator::css(EMAIL), FakeElement::of(ElementKind::TextInput))
        .with_submit(Locator::css(SUBMIT))
}

#[tokio::test]
async fn unconfirmed_submission_walks_every_state() {
    let site = simple_form().with_body(
        "Senior Engineer at Example Corp",
        "We are reviewing your form",
    );
    let source = FakePageSource::new(site);
    let profile = ApplicantProfile::with_email("ada@example.test");

    let outcome = flow(&source).execute(&job("genericboard"), &profile).await;

    assert_eq!(
        outcome.trail,
        vec![
            AttemptState::Start,
            AttemptState::Navigated,
            AttemptState::ApplyTriggered,
            AttemptState::FormFilled,
            AttemptState::Submitted,
            AttemptState::Finished(ApplicationStatus::Failed),
        ]
    );

    let result = outcome.result;
    assert_eq!(result.status(), ApplicationStatus::Failed);
    assert!(!result.success());
    assert_eq!(result.confidence_score(), 0.0);
    assert_eq!(result.filled_fields(), &[SemanticField::Email]);
    assert_eq!(result.application_method(), ApplicationMethod::NativeForm);
    assert!(result.error_message().is_some_and(|m| !m.is_empty()));

    let log = source.log();
    assert_eq!(log.typed.get(EMAIL).map(String::as_str), Some("ada@example.test"));
    assert_eq!(log.clicks, vec!["button:has-text(\"Apply\")".to_string(), SUBMIT.to_string()]);
    assert_eq!(log.opened, 1);
    assert_eq!(log.closed, 1);
}

#[tokio::test]
async fn confirmation_phrase_marks_applied() {
    let site = simple_form().with_body("Apply to this role", "Application Submitted!");
    let source = FakePageSource::new(site);

    let result = flow(&source)
        .execute(&job("Indeed"), &ApplicantProfile::with_email("ada@example.test"))
        .await
        .result;

    assert_eq!(result.status(), ApplicationStatus::Applied);
    assert!(result.success());
    assert!(result.confidence_score() >= 0.9);
    assert!(result.error_message().is_none());
}

#[tokio::test]
async fn consent_text_after_submit_is_not_a_confirmation() {
    let site = simple_form().with_body(
        "Apply to this role",
        "Please fill all required fields. I consent to the privacy policy.",
    );
    let source = FakePageSource::new(site);

    let result = flow(&source)
        .execute(&job("genericboard"), &ApplicantProfile::with_email("ada@example.test"))
        .await
        .result;

    assert_eq!(result.status(), ApplicationStatus::Failed);
    assert_eq!(result.confidence_score(), 0.0);
}

#[tokio::test]
async fn success_url_counts_as_confirmation() {
    let mut site = simple_form();
    site.url_after_submit = Some("https://example.test/job/1/thank-you".to_string());
    let source = FakePageSource::new(site);

    let result = flow(&source)
        .execute(&job("genericboard"), &ApplicantProfile::with_email("ada@example.test"))
        .await
        .result;

    assert_eq!(result.status(), ApplicationStatus::Applied);
}

#[tokio::test]
async fn missing_apply_control_fails_and_closes_page() {
    let site = FakeSite::new()
        .with(Locator::css(EMAIL), FakeElement::of(ElementKind::TextInput))
        .with_body("Nothing to see here", "");
    let source = FakePageSource::new(site);

    let outcome = flow(&source)
        .execute(&job("genericboard"), &ApplicantProfile::with_email("ada@example.test"))
        .await;

    assert_eq!(outcome.result.status(), ApplicationStatus::Failed);
    assert!(outcome.result.error_message().is_some_and(|m| !m.is_empty()));
    assert!(outcome.result.filled_fields().is_empty());
    assert_eq!(
        outcome.trail.last(),
        Some(&AttemptState::Finished(ApplicationStatus::Failed))
    );
    assert!(!outcome.trail.contains(&AttemptState::ApplyTriggered));

    let log = source.log();
    assert_eq!(log.opened, log.closed);
    assert!(log.typed.is_empty());
}

#[tokio::test]
async fn dedicated_flow_platform_is_not_supported() {
    let source = FakePageSource::new(FakeSite::new().with_body("Easy Apply unavailable", ""));

    let result = flow(&source)
        .execute(&job("linkedin"), &ApplicantProfile::with_email("ada@example.test"))
        .await
        .result;

    assert_eq!(result.status(), ApplicationStatus::NotSupported);
    assert!(!result.success());
    assert_eq!(source.log().closed, 1);
}

#[tokio::test]
async fn already_applied_page_stops_before_clicking() {
    let site = simple_form().with_body("You have already applied to this job", "");
    let source = FakePageSource::new(site);

    let result = flow(&source)
        .execute(&job("genericboard"), &ApplicantProfile::with_email("ada@example.test"))
        .await
        .result;

    assert_eq!(result.status(), ApplicationStatus::AlreadyApplied);
    assert!(!result.success());
    assert!(source.log().clicks.is_empty());
}

#[tokio::test]
async fn captcha_requires_manual_handling() {
    let site = simple_form().with(Locator::css(".g-recaptcha"), FakeElement::of(ElementKind::Other));
    let source = FakePageSource::new(site);

    let outcome = flow(&source)
        .execute(&job("genericboard"), &ApplicantProfile::with_email("ada@example.test"))
        .await;

    assert_eq!(outcome.result.status(), ApplicationStatus::RequiresManual);
    assert!(!outcome.trail.contains(&AttemptState::FormFilled));
    assert!(source.log().typed.is_empty());
}

#[tokio::test]
async fn empty_resume_path_is_skipped() {
    let site = simple_form()
        .with(Locator::css(PHONE), FakeElement::of(ElementKind::TextInput))
        .with(Locator::css(r#"input[type="file"]"#), FakeElement::of(ElementKind::FileInput));
    let source = FakePageSource::new(site);
    let profile = ApplicantProfile {
        phone: Some("+1 555 0100".to_string()),
        resume_path: Some(String::new()),
        ..ApplicantProfile::with_email("ada@example.test")
    };

    let outcome = flow(&source).execute(&job("genericboard"), &profile).await;

    assert!(outcome.trail.contains(&AttemptState::Submitted));
    assert_eq!(
        outcome.result.filled_fields(),
        &[SemanticField::Email, SemanticField::Phone]
    );
    assert!(source.log().uploads.is_empty());
}

#[tokio::test]
async fn missing_resume_file_is_skipped() {
    let site = simple_form()
        .with(Locator::css(r#"input[type="file"]"#), FakeElement::of(ElementKind::FileInput));
    let source = FakePageSource::new(site);
    let profile = ApplicantProfile {
        resume_path: Some("/definitely/not/here/cv.pdf".to_string()),
        ..ApplicantProfile::with_email("ada@example.test")
    };

    let result = flow(&source).execute(&job("genericboard"), &profile).await.result;

    assert!(!result.filled_fields().contains(&SemanticField::Resume));
    assert!(source.log().uploads.is_empty());
}

#[tokio::test]
async fn existing_resume_is_uploaded() {
    let resume = std::env::temp_dir().join(format!("auto_apply_cv_{}.pdf", std::process::id()));
    std::fs::write(&resume, b"%PDF-1.4").unwrap();

    let site = simple_form()
        .with(Locator::css(r#"input[type="file"]"#), FakeElement::of(ElementKind::FileInput));
    let source = FakePageSource::new(site);
    let profile = ApplicantProfile {
        resume_path: Some(resume.display().to_string()),
        ..ApplicantProfile::with_email("ada@example.test")
    };

    let result = flow(&source).execute(&job("genericboard"), &profile).await.result;
    let _ = std::fs::remove_file(&resume);

    assert!(result.filled_fields().contains(&SemanticField::Resume));
    assert_eq!(source.log().uploads, vec![resume]);
}

#[tokio::test]
async fn disabled_field_does_not_abort_the_form() {
    let site = simple_form().with(Locator::css(PHONE), FakeElement::disabled(ElementKind::TextInput));
    let source = FakePageSource::new(site);
    let profile = ApplicantProfile {
        phone: Some("+1 555 0100".to_string()),
        ..ApplicantProfile::with_email("ada@example.test")
    };

    let outcome = flow(&source).execute(&job("genericboard"), &profile).await;

    assert!(outcome.trail.contains(&AttemptState::Submitted));
    assert_eq!(outcome.result.filled_fields(), &[SemanticField::Email]);
    assert!(!source.log().typed.contains_key(PHONE));
}

#[tokio::test]
async fn filled_input_is_not_refilled_by_a_broader_field() {
    let first = Locator::css(r#"input[name*="first"]"#);
    let site = FakeSite::new()
        .with_apply(Locator::text("button", "Apply"))
        .with(first.clone(), FakeElement::of(ElementKind::TextInput))
        .with_alias(Locator::css(r#"input[name*="name"]"#), first.clone())
        .with_submit(Locator::css(SUBMIT));
    let source = FakePageSource::new(site);
    let profile = ApplicantProfile {
        first_name: Some("Ada".to_string()),
        full_name: Some("Ada Lovelace".to_string()),
        ..Default::default()
    };

    let result = flow(&source).execute(&job("genericboard"), &profile).await.result;

    assert_eq!(result.filled_fields(), &[SemanticField::FirstName]);
    let log = source.log();
    let selector = first.to_string();
    assert_eq!(log.focus_counts.get(&selector), Some(&1));
    assert_eq!(log.typed.get(&selector).map(String::as_str), Some("Ada"));
}

#[tokio::test]
async fn dropdown_is_selected_by_option_text() {
    let site = simple_form().with(
        Locator::css(r#"select[name*="experience"]"#),
        FakeElement::select(&["0-1", "2-4", "5+"]),
    );
    let source = FakePageSource::new(site);
    let profile = ApplicantProfile {
        experience_years: Some("5+".to_string()),
        ..ApplicantProfile::with_email("ada@example.test")
    };

    let result = flow(&source).execute(&job("genericboard"), &profile).await.result;

    assert!(result.filled_fields().contains(&SemanticField::Experience));
    assert_eq!(
        source
            .log()
            .selected
            .get(r#"select[name*="experience"]"#)
            .map(String::as_str),
        Some("5+")
    );
}

#[tokio::test]
async fn enter_key_submits_when_no_button_is_found() {
    let site = FakeSite::new()
        .with_apply(Locator::text("button", "Apply"))
        .with(Locator::css(EMAIL), FakeElement::of(ElementKind::TextInput))
        .with_body("Apply here", "Thank you for applying!");
    let source = FakePageSource::new(site);

    let outcome = flow(&source)
        .execute(&job("genericboard"), &ApplicantProfile::with_email("ada@example.test"))
        .await;

    assert_eq!(source.log().enter_presses, 1);
    assert!(outcome.trail.contains(&AttemptState::Submitted));
    assert_eq!(outcome.result.status(), ApplicationStatus::Applied);
}

#[tokio::test]
async fn failed_enter_fallback_is_a_submission_error() {
    let mut site = FakeSite::new()
        .with_apply(Locator::text("button", "Apply"))
        .with(Locator::css(EMAIL), FakeElement::of(ElementKind::TextInput));
    site.enter_fails = true;
    let source = FakePageSource::new(site);

    let outcome = flow(&source)
        .execute(&job("genericboard"), &ApplicantProfile::with_email("ada@example.test"))
        .await;

    assert_eq!(outcome.result.status(), ApplicationStatus::Failed);
    assert!(outcome.trail.contains(&AttemptState::FormFilled));
    assert!(!outcome.trail.contains(&AttemptState::Submitted));
    assert_eq!(source.log().closed, 1);
}

#[tokio::test]
async fn leaving_the_platform_is_an_external_application() {
    let mut site = simple_form();
    site.url_after_apply = Some("https://careers.other-ats.test/form/42".to_string());
    let source = FakePageSource::new(site);

    let result = flow(&source)
        .execute(&job("genericboard"), &ApplicantProfile::with_email("ada@example.test"))
        .await
        .result;

    assert_eq!(result.application_method(), ApplicationMethod::External);
    assert_eq!(result.status(), ApplicationStatus::Failed);
    assert_eq!(result.confidence_score(), 0.0);
}

#[tokio::test]
async fn navigation_error_names_the_url() {
    let mut site = simple_form();
    site.navigation_error = Some("net::ERR_NAME_NOT_RESOLVED".to_string());
    let source = FakePageSource::new(site);

    let outcome = flow(&source)
        .execute(&job("genericboard"), &ApplicantProfile::with_email("ada@example.test"))
        .await;

    assert_eq!(outcome.result.status(), ApplicationStatus::Failed);
    let message = outcome.result.error_message().unwrap_or_default();
    assert!(message.contains("https://example.test/job/1"), "{}", message);
    assert_eq!(outcome.trail, vec![AttemptState::Start, AttemptState::Finished(ApplicationStatus::Failed)]);
    assert_eq!(source.log().closed, 1);
}

#[tokio::test]
async fn invalid_job_url_fails_without_navigating() {
    let source = FakePageSource::new(simple_form());
    let job = JobPosting::new("bad", "not a url", "genericboard");

    let result = flow(&source)
        .execute(&job, &ApplicantProfile::with_email("ada@example.test"))
        .await
        .result;

    assert_eq!(result.status(), ApplicationStatus::Failed);
    assert!(source.log().clicks.is_empty());
}

#[tokio::test]
async fn slow_page_hits_the_attempt_timeout() {
    let mut site = simple_form();
    site.navigation_delay = Duration::from_millis(500);
    let source = FakePageSource::new(site);
    let settings = FlowSettings {
        attempt_timeout: Duration::from_millis(50),
        ..FlowSettings::immediate()
    };

    let outcome = flow_with(&source, settings)
        .execute(&job("genericboard"), &ApplicantProfile::with_email("ada@example.test"))
        .await;

    assert_eq!(outcome.result.status(), ApplicationStatus::Failed);
    assert!(outcome.result.error_message().is_some());
    let log = source.log();
    assert_eq!(log.opened, 1);
    assert_eq!(log.closed, 1);
}

#[tokio::test]
async fn page_open_failure_is_a_failed_result() {
    let mut site = simple_form();
    site.open_error = Some("browser went away".to_string());
    let source = FakePageSource::new(site);

    let outcome = flow(&source)
        .execute(&job("genericboard"), &ApplicantProfile::with_email("ada@example.test"))
        .await;

    assert_eq!(outcome.result.status(), ApplicationStatus::Failed);
    assert!(outcome
        .result
        .error_message()
        .is_some_and(|m| m.contains("browser went away")));
    assert_eq!(source.log().opened, 0);
}

#[tokio::test]
async fn screenshot_is_saved_when_directory_is_configured() {
    let dir = std::env::temp_dir().join(format!("auto_apply_shots_{}", std::process::id()));
    let source = FakePageSource::new(simple_form().with_body("", "Application submitted"));
    let settings = FlowSettings {
        screenshots_dir: Some(dir.clone()),
        ..FlowSettings::immediate()
    };

    let result = flow_with(&source, settings)
        .execute(&job("genericboard"), &ApplicantProfile::with_email("ada@example.test"))
        .await
        .result;

    let path = result.screenshot_path().map(std::path::PathBuf::from);
    let _ = std::fs::remove_dir_all(&dir);
    assert!(path.is_some_and(|p| p.starts_with(&dir)));
}
