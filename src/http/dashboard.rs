//! Static status dashboard served at `/dashboard`.
//!
//! The page polls `/health` from the browser; it carries no server-side state.

pub const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Titan Dashboard</title>
<style>
  body { font-family: system-ui, sans-serif; background: #0f1419; color: #e6e6e6; margin: 2rem; }
  h1 { font-weight: 600; }
  .card { background: #1a2129; border-radius: 8px; padding: 1rem 1.5rem; max-width: 28rem; }
  .ok { color: #5fd38d; }
  .down { color: #ff6b6b; }
  dt { color: #8b98a5; }
  dd { margin: 0 0 0.75rem 0; }
</style>
</head>
<body>
<h1>Titan</h1>
<div class="card">
  <dl>
    <dt>Status</dt><dd id="status">checking...</dd>
    <dt>Service</dt><dd id="service">-</dd>
    <dt>Version</dt><dd id="version">-</dd>
    <dt>Last check</dt><dd id="checked">-</dd>
  </dl>
</div>
<script>
async function refresh() {
  const status = document.getElementById("status");
  try {
    const res = await fetch("/health", { cache: "no-store" });
    const body = await res.json();
    status.textContent = body.status;
    status.className = body.status === "ok" ? "ok" : "down";
    document.getElementById("service").textContent = body.service;
    document.getElementById("version").textContent = body.version;
  } catch (e) {
    status.textContent = "unreachable";
    status.className = "down";
  }
  document.getElementById("checked").textContent = new Date().toLocaleTimeString();
}
refresh();
setInterval(refresh, 5000);
</script>
</body>
</html>
"#;
