use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;

use crate::{
    auth::cookie,
    handlers::{auth::sign_in, AppState},
    middleware::auth::PageSession,
    stats::chart::escape_xml,
};

const LOGIN_PAGE: &str = include_str!("../../site/login.html");
const DASHBOARD_PAGE: &str = include_str!("../../site/dashboard.html");
const SUPER_ADMIN_PAGE: &str = include_str!("../../site/super_admin.html");

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub identifier: String,
    pub password: String,
}

fn render_login(error: Option<&str>, identifier: &str) -> Html<String> {
    let error_block = error
        .map(|message| format!(r#"<p class="error" role="alert">{}</p>"#, escape_xml(message)))
        .unwrap_or_default();
    Html(
        LOGIN_PAGE
            .replace("{{error}}", &error_block)
            .replace("{{identifier}}", &escape_xml(identifier)),
    )
}

pub async fn login_page(session: Option<PageSession>) -> Response {
    match session {
        Some(_) => Redirect::to("/").into_response(),
        None => render_login(None, "").into_response(),
    }
}

pub async fn login_submit(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    match sign_in(&state, &form.identifier, &form.password).await {
        Ok((session, info)) => (
            [(header::SET_COOKIE, state.session_cookie(&session))],
            Redirect::to(&info.redirect),
        )
            .into_response(),
        Err(e) => {
            tracing::debug!("Login form rejected: {}", e);
            (
                e.status(),
                [(header::SET_COOKIE, cookie::clear_session_cookie())],
                render_login(Some(&e.user_message()), &form.identifier),
            )
                .into_response()
        }
    }
}

pub async fn logout() -> Response {
    (
        [(header::SET_COOKIE, cookie::clear_session_cookie())],
        Redirect::to("/login"),
    )
        .into_response()
}

pub async fn dashboard(PageSession(admin): PageSession) -> Html<String> {
    Html(render_shell(DASHBOARD_PAGE, &admin.username, admin.is_super_admin))
}

pub async fn super_admin(PageSession(admin): PageSession) -> Response {
    if !admin.is_super_admin {
        return Redirect::to("/").into_response();
    }
    Html(render_shell(SUPER_ADMIN_PAGE, &admin.username, true)).into_response()
}

fn render_shell(template: &str, username: &str, is_super_admin: bool) -> String {
    let super_admin_link = if is_super_admin {
        r#"<a href="/super-admin">Manage admins</a>"#
    } else {
        ""
    };
    template
        .replace("{{username}}", &escape_xml(username))
        .replace("{{super_admin_link}}", super_admin_link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_page_escapes_error_and_identifier() {
        let Html(page) = render_login(Some("<bad>"), "\"alice\"");
        assert!(page.contains("&lt;bad&gt;"));
        assert!(page.contains("&quot;alice&quot;"));
        assert!(!page.contains("{{error}}"));
    }

    #[test]
    fn test_shell_link_only_for_super_admin() {
        assert!(render_shell(DASHBOARD_PAGE, "bob", true).contains("/super-admin"));
        assert!(!render_shell(DASHBOARD_PAGE, "bob", false).contains("Manage admins"));
        assert!(render_shell(DASHBOARD_PAGE, "bob", false).contains("bob"));
    }
}
