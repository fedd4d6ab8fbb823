use super::*;
use crate::test_support::{FakeApi, TOKEN};

#[tokio::test]
async fn successful_login_stores_token() {
    let api = FakeApi::new(Vec::new());
    let mut session = Session::new();

    session.login(&api, "admin", "secret").await.expect("login");

    assert!(session.is_authenticated());
    assert_eq!(session.bearer(), Ok(TOKEN));
}

#[tokio::test]
async fn rejected_login_never_populates_token() {
    let api = FakeApi::rejecting_login(401);
    let mut session = Session::new();

    let err = session
        .login(&api, "admin", "wrong")
        .await
        .expect_err("rejected");

    assert!(matches!(err, AuthError::InvalidCredentials(_)));
    assert!(!session.is_authenticated());
    assert_eq!(session.bearer(), Err(AuthError::NotAuthenticated));
    assert_eq!(
        session.navigate(View::Identification),
        Navigation::Redirected {
            to: View::Login,
            warning: LOGIN_REQUIRED_WARNING,
        }
    );
}

#[tokio::test]
async fn failed_relogin_keeps_existing_token() {
    let api = FakeApi::new(Vec::new());
    let mut session = Session::new();
    session.login(&api, "admin", "secret").await.expect("login");

    api.set_login(Err(AuthError::ConnectionFailure("refused".into())));
    session
        .login(&api, "admin", "secret")
        .await
        .expect_err("offline");

    assert_eq!(session.bearer(), Ok(TOKEN));
}

#[test]
fn protected_views_redirect_until_authenticated() {
    for view in View::ALL {
        let navigation = guard_navigation(false, view);
        if view.is_protected() {
            assert_eq!(navigation.view(), View::Login, "{view:?}");
        } else {
            assert_eq!(navigation, Navigation::Allowed(View::Login));
        }
        assert_eq!(guard_navigation(true, view), Navigation::Allowed(view));
    }
}
