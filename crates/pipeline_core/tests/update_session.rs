use std::sync::Once;

use pipeline_core::{
    update, AppState, ControllerConfig, Credential, Effect, LoginCredentials, Msg,
    OperationStatus, SessionState,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(pipeline_logging::initialize_for_tests);
}

fn logged_in(token: &str) -> AppState {
    let (state, _) = update(AppState::new(), Msg::LoginClicked);
    let (state, _) = update(state, Msg::LoginSucceeded(Credential::new(token, None)));
    state
}

#[test]
fn login_click_requests_token_with_configured_credentials() {
    init_logging();
    let config = ControllerConfig {
        credentials: LoginCredentials {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
        },
        ..ControllerConfig::default()
    };

    let (mut state, effects) = update(AppState::with_config(config), Msg::LoginClicked);

    assert_eq!(
        effects,
        vec![Effect::RequestToken {
            credentials: LoginCredentials {
                username: "alice".to_string(),
                password: "hunter2".to_string(),
            }
        }]
    );
    let view = state.view();
    assert_eq!(view.login, OperationStatus::Pending);
    assert!(!view.submit_enabled);
    assert!(view.is_busy());
    assert!(state.consume_dirty());
}

#[test]
fn successful_login_enables_submission() {
    init_logging();
    let state = AppState::new();
    assert!(!state.view().submit_enabled);

    let state = logged_in("abc");
    let view = state.view();

    assert!(view.logged_in);
    assert!(view.submit_enabled);
    assert_eq!(view.login, OperationStatus::Succeeded);
    assert_eq!(
        state.session(),
        &SessionState::LoggedIn(Credential::new("abc", None))
    );
}

#[test]
fn token_type_is_exposed_in_view() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::LoginSucceeded(Credential::new("abc", Some("bearer".to_string()))),
    );
    assert_eq!(state.view().token_type.as_deref(), Some("bearer"));
}

#[test]
fn failed_login_keeps_submission_disabled_and_reports_reason() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::LoginClicked);
    let (mut state, effects) = update(
        state,
        Msg::LoginFailed("Incorrect username or password".to_string()),
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert!(!view.logged_in);
    assert!(!view.submit_enabled);
    assert_eq!(
        view.login.failure(),
        Some("Incorrect username or password")
    );
    assert!(!view.is_busy());
    assert!(state.consume_dirty());
}

#[test]
fn failed_relogin_keeps_previous_credential() {
    init_logging();
    let state = logged_in("first");
    let (state, _) = update(state, Msg::LoginClicked);
    let (state, _) = update(state, Msg::LoginFailed("network error".to_string()));

    assert!(state.view().submit_enabled);
    assert_eq!(
        state.session().credential().map(Credential::token),
        Some("first")
    );
}

#[test]
fn later_login_response_overwrites_earlier_one() {
    init_logging();
    let (state, first) = update(AppState::new(), Msg::LoginClicked);
    let (state, second) = update(state, Msg::LoginClicked);
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);

    let (state, _) = update(state, Msg::LoginSucceeded(Credential::new("one", None)));
    let (state, _) = update(state, Msg::LoginSucceeded(Credential::new("two", None)));

    assert_eq!(
        state.session().credential().map(Credential::token),
        Some("two")
    );
}
