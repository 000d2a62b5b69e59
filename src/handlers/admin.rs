use crate::error::{ApiError, ApiResult};
use crate::middleware::admin::{admin_middleware, current_session};
use crate::models::admin::{
    CleanupRequest, CleanupResponse, RecentGenerationsResponse, RecentQuery, StatisticsResponse,
};
use crate::services::stats::{clamp_recent_limit, DEFAULT_RETENTION_DAYS, MAX_RETENTION_DAYS};
use crate::AppState;
use axum::{
    extract::{Extension, Query},
    http::HeaderMap,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;

pub fn admin_routes() -> Router {
    let pages = Router::new()
        .route("/admin", get(admin_dashboard))
        .route("/admin/login", get(admin_login_page));

    let protected_api = Router::new()
        .route("/api/admin/statistics", get(statistics))
        .route("/api/admin/recent-generations", get(recent_generations))
        .route("/api/admin/cleanup", post(cleanup))
        .layer(axum::middleware::from_fn(admin_middleware));

    pages.merge(protected_api)
}

async fn statistics(
    Extension(state): Extension<Arc<AppState>>,
) -> ApiResult<Json<StatisticsResponse>> {
    let statistics = state.stats.get_statistics().await?;
    Ok(Json(StatisticsResponse {
        success: true,
        statistics,
    }))
}

async fn recent_generations(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Json<RecentGenerationsResponse>> {
    let generations = state
        .stats
        .recent_generations(clamp_recent_limit(query.limit))
        .await?;
    Ok(Json(RecentGenerationsResponse {
        success: true,
        generations,
    }))
}

async fn cleanup(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<CleanupRequest>>,
) -> ApiResult<Json<CleanupResponse>> {
    let days = payload
        .and_then(|Json(req)| req.days)
        .unwrap_or(DEFAULT_RETENTION_DAYS);
    if !(1..=MAX_RETENTION_DAYS).contains(&days) {
        return Err(ApiError::BadRequest(format!(
            "days must be between 1 and {}",
            MAX_RETENTION_DAYS
        )));
    }

    let deleted = state.stats.cleanup_old_records(days).await?;
    Ok(Json(CleanupResponse {
        success: true,
        deleted,
        days,
    }))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

async fn admin_login_page(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    if current_session(&state, &jar, &headers).is_some() {
        return Redirect::to("/admin").into_response();
    }

    let html = r###"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Admin Login - Media Generator</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f8f9fa; display: flex; align-items: center; justify-content: center; min-height: 100vh; margin: 0; }
        .admin-container { background: white; padding: 3rem; border-radius: 10px; box-shadow: 0 10px 30px rgba(0,0,0,0.1); width: 100%; max-width: 400px; }
        .admin-header { text-align: center; margin-bottom: 2rem; }
        .admin-header h1 { color: #6f42c1; font-size: 2rem; margin-bottom: 0.5rem; }
        .form-group { margin-bottom: 1.5rem; }
        .form-group label { display: block; margin-bottom: 0.5rem; color: #2c3e50; font-weight: 600; }
        .form-group input { width: 100%; padding: 0.75rem; border: 2px solid #e9ecef; border-radius: 8px; font-size: 1rem; box-sizing: border-box; }
        .btn { width: 100%; padding: 0.75rem; background: #6f42c1; color: white; border: none; border-radius: 8px; font-size: 1rem; font-weight: 600; cursor: pointer; }
        .error { background: #f8d7da; border: 1px solid #f5c6cb; padding: 1rem; border-radius: 8px; margin-bottom: 1rem; color: #721c24; display: none; }
    </style>
</head>
<body>
    <div class="admin-container">
        <div class="admin-header">
            <h1>🛡️ Admin Login</h1>
            <p>Generation statistics console</p>
        </div>

        <div id="errorMessage" class="error"></div>

        <form id="adminLoginForm">
            <div class="form-group">
                <label for="username">Username</label>
                <input type="text" id="username" name="username" required>
            </div>
            <div class="form-group">
                <label for="password">Password</label>
                <input type="password" id="password" name="password" required>
            </div>
            <button type="submit" class="btn">Sign in</button>
        </form>
    </div>

    <script>
        document.getElementById('adminLoginForm').addEventListener('submit', async (e) => {
            e.preventDefault();
            const errorBox = document.getElementById('errorMessage');
            const username = document.getElementById('username').value;
            const password = document.getElementById('password').value;

            try {
                const response = await fetch('/api/admin/login', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({ username, password }),
                });
                const data = await response.json();

                if (data.success) {
                    window.location.href = data.redirect || '/admin';
                } else {
                    errorBox.textContent = data.message || data.error;
                    errorBox.style.display = 'block';
                }
            } catch (error) {
                errorBox.textContent = 'Network error. Please try again.';
                errorBox.style.display = 'block';
            }
        });
    </script>
</body>
</html>
    "###;

    Html(html).into_response()
}

async fn admin_dashboard(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    let Some(session) = current_session(&state, &jar, &headers) else {
        return Redirect::to("/admin/login").into_response();
    };

    let username = escape_html(&session.sub);
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

    let html = format!(
        r###"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Admin Dashboard - Media Generator</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f8f9fa; margin: 0; padding: 2rem; }}
        .header {{ display: flex; justify-content: space-between; align-items: center; margin-bottom: 2rem; }}
        .cards {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 1rem; margin-bottom: 2rem; }}
        .card {{ background: white; padding: 1.5rem; border-radius: 10px; box-shadow: 0 4px 12px rgba(0,0,0,0.06); }}
        .card .value {{ font-size: 2rem; font-weight: 700; color: #6f42c1; }}
        table {{ width: 100%; background: white; border-collapse: collapse; border-radius: 10px; overflow: hidden; }}
        th, td {{ padding: 0.75rem; border-bottom: 1px solid #e9ecef; text-align: left; font-size: 0.9rem; }}
        .status-success {{ color: #28a745; }}
        .status-failed {{ color: #dc3545; }}
        .btn {{ padding: 0.5rem 1rem; background: #6f42c1; color: white; border: none; border-radius: 6px; cursor: pointer; text-decoration: none; }}
    </style>
</head>
<body>
    <div class="header">
        <div>
            <h1>📊 Generation Dashboard</h1>
            <p>Signed in as <strong>{username}</strong> · {now}</p>
        </div>
        <div>
            <button class="btn" onclick="cleanup()">Clean up old records</button>
            <a class="btn" href="/api/admin/logout">Sign out</a>
        </div>
    </div>

    <div class="cards">
        <div class="card"><div>Total</div><div class="value" id="total">-</div></div>
        <div class="card"><div>Today</div><div class="value" id="today">-</div></div>
        <div class="card"><div>Images</div><div class="value" id="images">-</div></div>
        <div class="card"><div>Videos</div><div class="value" id="videos">-</div></div>
        <div class="card"><div>Success rate</div><div class="value" id="rate">-</div></div>
    </div>

    <table>
        <thead><tr><th>ID</th><th>Type</th><th>Prompt</th><th>Status</th><th>Model</th><th>Time (s)</th><th>Files</th><th>Created</th></tr></thead>
        <tbody id="recent"></tbody>
    </table>

    <script>
        function cell(text) {{
            const td = document.createElement('td');
            td.textContent = text ?? '';
            return td;
        }}

        async function loadStatistics() {{
            const response = await fetch('/api/admin/statistics');
            const data = await response.json();
            if (!data.success) return;
            const s = data.statistics;
            document.getElementById('total').textContent = s.total_generations;
            document.getElementById('today').textContent = s.today_generations;
            document.getElementById('images').textContent = s.image_generations;
            document.getElementById('videos').textContent = s.video_generations;
            document.getElementById('rate').textContent = s.success_rate + '%';
        }}

        async function loadRecent() {{
            const response = await fetch('/api/admin/recent-generations?limit=20');
            const data = await response.json();
            if (!data.success) return;
            const body = document.getElementById('recent');
            body.innerHTML = '';
            for (const g of data.generations) {{
                const row = document.createElement('tr');
                row.appendChild(cell(g.id));
                row.appendChild(cell(g.generation_type));
                row.appendChild(cell(g.prompt));
                const status = cell(g.status);
                status.className = 'status-' + g.status;
                row.appendChild(status);
                row.appendChild(cell(g.model_name));
                row.appendChild(cell(g.generation_time != null ? g.generation_time.toFixed(2) : ''));
                row.appendChild(cell(g.file_count));
                row.appendChild(cell(new Date(g.created_at).toLocaleString()));
                body.appendChild(row);
            }}
        }}

        async function cleanup() {{
            const response = await fetch('/api/admin/cleanup', {{
                method: 'POST',
                headers: {{ 'Content-Type': 'application/json' }},
                body: JSON.stringify({{ days: 30 }}),
            }});
            const data = await response.json();
            alert('Removed ' + data.deleted + ' records older than ' + data.days + ' days');
            loadStatistics();
            loadRecent();
        }}

        loadStatistics();
        loadRecent();
    </script>
</body>
</html>
    "###
    );

    Html(html).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"x\" & y</b>"), "&lt;b&gt;&quot;x&quot; &amp; y&lt;/b&gt;");
    }
}
