use std::fmt::Write;

use axum::response::Html;
use time::{macros::format_description, OffsetDateTime};

use super::{
    session::{Flash, FlashKind},
    stats::UserStats,
};
use crate::{
    config::ClientConfig,
    users::dto::{HealthResponse, PublicUser},
};

const STYLE: &str = "body{font-family:sans-serif;margin:0;background:#f5f6f8}\
nav{background:#263238;padding:.6rem 1rem}nav a{color:#fff;margin-right:1rem;text-decoration:none}\
main{padding:1.5rem;max-width:960px;margin:auto}table{border-collapse:collapse;width:100%;background:#fff}\
td,th{border:1px solid #ddd;padding:.4rem;text-align:left}.alert{padding:.6rem;margin-bottom:1rem;border-radius:4px}\
.alert.success{background:#d4edda}.alert.error{background:#f8d7da}.alert.info{background:#d1ecf1}\
.card{display:inline-block;background:#fff;padding:1rem;margin:.3rem;min-width:140px;border-radius:4px}";

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_ts(ts: OffsetDateTime) -> String {
    ts.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_default()
}

fn opt(v: Option<&str>) -> String {
    escape(v.unwrap_or(""))
}

fn flashes_html(flashes: &[Flash]) -> String {
    flashes.iter().fold(String::new(), |mut out, f| {
        let _ = write!(
            out,
            r#"<div class="alert {}">{}</div>"#,
            f.kind.css_class(),
            escape(&f.message)
        );
        out
    })
}

fn error_banner(error: Option<&str>) -> String {
    error
        .map(|e| format!(r#"<div class="alert error">{}</div>"#, escape(e)))
        .unwrap_or_default()
}

fn page(title: &str, user: Option<&PublicUser>, flashes: &[Flash], body: &str) -> Html<String> {
    let nav = match user {
        Some(u) => format!(
            r#"<nav><a href="/dashboard">Dashboard</a><a href="/users">Users</a><a href="/reports">Reports</a><a href="/settings">Settings</a><a href="/profile">{}</a><a href="/logout">Logout</a></nav>"#,
            escape(&u.username)
        ),
        None => String::from("<nav><a href=\"/login\">User Management</a></nav>"),
    };
    Html(format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title} - User Management</title>\
         <style>{STYLE}</style></head><body>{nav}<main>{flashes}<h1>{title}</h1>{body}</main></body></html>",
        title = escape(title),
        flashes = flashes_html(flashes),
    ))
}

pub fn login_page(message: Option<Flash>) -> Html<String> {
    let flashes: Vec<Flash> = message.into_iter().collect();
    page(
        "Login",
        None,
        &flashes,
        r#"<form method="post" action="/login">
<p><label>Username <input name="username" required autofocus></label></p>
<p><label>Password <input name="password" type="password" required></label></p>
<p><button type="submit">Sign in</button></p>
</form>"#,
    )
}

fn user_rows(users: &[PublicUser], admin: bool) -> String {
    users.iter().fold(String::new(), |mut out, u| {
        let actions = if admin {
            format!(
                r#"<td><form method="post" action="/users/{id}/toggle" style="display:inline"><button>{toggle}</button></form> <button onclick="deleteUser({id})">Delete</button></td>"#,
                id = u.id,
                toggle = if u.is_active { "Deactivate" } else { "Activate" },
            )
        } else {
            String::new()
        };
        let _ = write!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>{}</tr>",
            u.id,
            escape(&u.username),
            escape(&u.email),
            escape(&u.display_name()),
            u.role,
            if u.is_active { "active" } else { "inactive" },
            format_ts(u.created_at),
            actions,
        );
        out
    })
}

fn users_table(users: &[PublicUser], admin: bool) -> String {
    if users.is_empty() {
        return "<p>No users to show.</p>".into();
    }
    format!(
        "<table><tr><th>ID</th><th>Username</th><th>Email</th><th>Name</th><th>Role</th><th>Status</th><th>Created</th>{}</tr>{}</table>",
        if admin { "<th>Actions</th>" } else { "" },
        user_rows(users, admin)
    )
}

pub fn dashboard_page(
    user: &PublicUser,
    flashes: &[Flash],
    stats: &UserStats,
    recent: &[PublicUser],
    error: Option<&str>,
) -> Html<String> {
    let body = format!(
        r#"{error}<p>Welcome, {name}!</p>
<div class="card"><h3>Total users</h3><p>{total}</p></div>
<div class="card"><h3>Active users</h3><p>{active}</p></div>
<div class="card"><h3>Administrators</h3><p>{admins}</p></div>
<h2>Recent users</h2>{table}"#,
        error = error_banner(error),
        name = escape(&user.display_name()),
        total = stats.total_users,
        active = stats.active_users,
        admins = stats.admin_users,
        table = users_table(recent, false),
    );
    page("Dashboard", Some(user), flashes, &body)
}

pub fn users_page(
    user: &PublicUser,
    flashes: &[Flash],
    users: &[PublicUser],
    search: Option<&str>,
    error: Option<&str>,
) -> Html<String> {
    let admin = user.is_admin();
    let create_form = if admin {
        r#"<h2>Add user</h2><form method="post" action="/users">
<input name="username" placeholder="Username" required>
<input name="email" type="email" placeholder="Email" required>
<input name="password" type="password" placeholder="Password" required>
<input name="first_name" placeholder="First name">
<input name="last_name" placeholder="Last name">
<select name="role"><option value="user">user</option><option value="admin">admin</option></select>
<button type="submit">Create</button></form>
<script>
function deleteUser(id) {
  if (!confirm('Delete user ' + id + '?')) return;
  fetch('/users/' + id, {method: 'DELETE'})
    .then(r => r.json())
    .then(d => { if (d.success) { location.reload(); } else { alert(d.error || 'Delete failed'); } });
}
</script>"#
    } else {
        ""
    };
    let body = format!(
        r#"{error}<form method="get" action="/users"><input name="q" value="{q}" placeholder="Search"> <button>Search</button></form>
{table}{create_form}"#,
        error = error_banner(error),
        q = opt(search),
        table = users_table(users, admin),
    );
    page("Users", Some(user), flashes, &body)
}

pub fn profile_page(user: &PublicUser, flashes: &[Flash]) -> Html<String> {
    let body = format!(
        "<table>\
         <tr><th>Username</th><td>{}</td></tr>\
         <tr><th>Email</th><td>{}</td></tr>\
         <tr><th>First name</th><td>{}</td></tr>\
         <tr><th>Last name</th><td>{}</td></tr>\
         <tr><th>Role</th><td>{}</td></tr>\
         <tr><th>Status</th><td>{}</td></tr>\
         <tr><th>Member since</th><td>{}</td></tr>\
         </table>",
        escape(&user.username),
        escape(&user.email),
        opt(user.first_name.as_deref()),
        opt(user.last_name.as_deref()),
        user.role,
        if user.is_active { "active" } else { "inactive" },
        format_ts(user.created_at),
    );
    page("Profile", Some(user), flashes, &body)
}

pub fn reports_page(
    user: &PublicUser,
    flashes: &[Flash],
    stats: &UserStats,
    error: Option<&str>,
) -> Html<String> {
    let body = format!(
        "{}<table>\
         <tr><th>Total users</th><td>{}</td></tr>\
         <tr><th>Active</th><td>{} ({}%)</td></tr>\
         <tr><th>Inactive</th><td>{}</td></tr>\
         <tr><th>Administrators</th><td>{}</td></tr>\
         <tr><th>Regular users</th><td>{}</td></tr>\
         </table>",
        error_banner(error),
        stats.total_users,
        stats.active_users,
        stats.active_percent(),
        stats.inactive_users,
        stats.admin_users,
        stats.regular_users,
    );
    page("Reports", Some(user), flashes, &body)
}

pub fn settings_page(
    user: &PublicUser,
    flashes: &[Flash],
    config: &ClientConfig,
    health: Result<&HealthResponse, &str>,
) -> Html<String> {
    let status = match health {
        Ok(h) => format!(
            "{} ({} users)",
            escape(&h.status),
            h.users_count
        ),
        Err(e) => format!(r#"<span class="alert error">{}</span>"#, escape(e)),
    };
    let body = format!(
        "<table>\
         <tr><th>API URL</th><td>{}</td></tr>\
         <tr><th>API status</th><td>{}</td></tr>\
         <tr><th>Request timeout</th><td>{}s</td></tr>\
         <tr><th>Session idle timeout</th><td>{} min</td></tr>\
         </table>",
        escape(&config.api_url),
        status,
        config.request_timeout.as_secs(),
        config.session_idle_timeout.as_secs() / 60,
    );
    page("Settings", Some(user), flashes, &body)
}

/// Flash used by the login page after logout.
pub fn logged_out() -> Flash {
    Flash::new(FlashKind::Info, "You have been logged out")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::Role;

    fn user(role: Role) -> PublicUser {
        PublicUser {
            id: 2,
            username: "<b>eve</b>".into(),
            email: "eve@example.com".into(),
            first_name: Some("Eve".into()),
            last_name: None,
            role,
            is_active: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: None,
        }
    }

    #[test]
    fn escape_handles_markup() {
        assert_eq!(
            escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn login_page_shows_message() {
        let Html(html) = login_page(Some(Flash::new(FlashKind::Error, "Invalid <credentials>")));
        assert!(html.contains("Invalid &lt;credentials&gt;"));
        assert!(html.contains(r#"action="/login""#));
    }

    #[test]
    fn users_page_hides_admin_controls_from_users() {
        let u = user(Role::User);
        let Html(html) = users_page(&u, &[], std::slice::from_ref(&u), None, None);
        assert!(!html.contains("Add user"));
        assert!(!html.contains("deleteUser("));
        assert!(html.contains("&lt;b&gt;eve&lt;/b&gt;"));
        assert!(!html.contains("<b>eve</b>"));

        let a = user(Role::Admin);
        let Html(html) = users_page(&a, &[], std::slice::from_ref(&a), Some("ev"), None);
        assert!(html.contains("Add user"));
        assert!(html.contains("/users/2/toggle"));
        assert!(html.contains(r#"value="ev""#));
    }

    #[test]
    fn dashboard_shows_error_banner() {
        let u = user(Role::User);
        let Html(html) = dashboard_page(&u, &[], &UserStats::default(), &[], Some("API unreachable"));
        assert!(html.contains("API unreachable"));
        assert!(html.contains("No users to show."));
    }

    #[test]
    fn timestamps_are_formatted() {
        assert_eq!(format_ts(OffsetDateTime::UNIX_EPOCH), "1970-01-01 00:00");
    }
}
