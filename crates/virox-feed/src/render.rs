//! HTML rendering of the feed.
//!
//! `render_feed` is a pure function of the list and the position. The page
//! shell around it carries the upload control, the navigation buttons and a
//! small script that talks to the HTTP API and the live-push socket.

use std::fmt::Write as _;

use virox_models::VideoRecord;

use crate::mode::FeedMode;
use crate::session::{FeedSession, SessionId};

/// Shown instead of the stack when there are no videos.
pub const EMPTY_FEED_MESSAGE: &str = "No hay videos aún. Sube el primero.";

/// Tooltip on the upload control in demo mode.
pub const UPLOAD_DISABLED_TITLE: &str = "Subida deshabilitada en modo demo";

/// Escape `& < > " '` and nothing else.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the video stack for `videos` with `current` docked in view.
///
/// Each card is offset by `(index - current) * 100%`. Only the current video
/// autoplays.
pub fn render_feed(videos: &[VideoRecord], current: usize) -> String {
    if videos.is_empty() {
        return format!(r#"<div class="feed-empty">{}</div>"#, EMPTY_FEED_MESSAGE);
    }

    let mut html = String::new();
    for (idx, video) in videos.iter().enumerate() {
        let offset = (idx as i64 - current as i64) * 100;
        let active = if idx == current {
            r#" autoplay loop data-active="true""#
        } else {
            ""
        };

        // Writing into a String cannot fail.
        let _ = write!(
            html,
            concat!(
                r#"<div class="video-card" style="transform: translateY({offset}%)">"#,
                r#"<video src="{url}" controls playsinline preload="metadata"{active}></video>"#,
                r#"<div class="video-meta" data-like="{id}">"#,
                r#"<h3>{title}</h3><p>{category} • ❤️ <span class="likes">{likes}</span></p>"#,
                "</div></div>"
            ),
            offset = offset,
            url = escape_html(&video.url),
            active = active,
            id = escape_html(video.id.as_str()),
            title = escape_html(video.display_title()),
            category = escape_html(video.display_category()),
            likes = video.likes,
        );
    }
    html
}

/// Render the whole page for one page session.
///
/// The session id is stamped on `<body>` so the script can name its session
/// on every request.
pub fn render_page(session: &FeedSession, session_id: &SessionId) -> String {
    let upload_label = match session.mode() {
        FeedMode::Demo => format!(
            r#"<label id="uploadLabel" class="upload-label" style="opacity: 0.6" title="{}">Subir video<input id="fileInput" type="file" accept="video/*" disabled></label>"#,
            UPLOAD_DISABLED_TITLE
        ),
        FeedMode::Live => {
            r#"<label id="uploadLabel" class="upload-label">Subir video<input id="fileInput" type="file" accept="video/*"></label>"#
                .to_string()
        }
    };

    format!(
        r#"<!doctype html>
<html lang="es">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Virox</title>
<style>{style}</style>
</head>
<body data-mode="{mode}" data-session="{session_id}">
<header class="topbar">
<h1>Virox</h1>
{upload_label}
<span id="uploadStatus" class="upload-status">{status}</span>
</header>
<main id="videosContainer" class="feed">{feed}</main>
<nav class="controls">
<button id="prevBtn" type="button" aria-label="Anterior">▲</button>
<button id="nextBtn" type="button" aria-label="Siguiente">▼</button>
</nav>
<script>{script}</script>
</body>
</html>
"#,
        style = PAGE_STYLE,
        mode = session.mode(),
        session_id = escape_html(session_id.as_str()),
        upload_label = upload_label,
        status = escape_html(session.upload_status().text()),
        feed = session.render_feed(),
        script = PAGE_SCRIPT,
    )
}

const PAGE_STYLE: &str = r#"
* { box-sizing: border-box; }
body { margin: 0; background: #000; color: #fff; font-family: system-ui, sans-serif; }
.topbar { position: fixed; top: 0; left: 0; right: 0; z-index: 10; display: flex; gap: 12px; align-items: center; padding: 8px 16px; background: rgba(0,0,0,.5); }
.topbar h1 { font-size: 1.2rem; margin: 0; flex: 1; }
.upload-label { cursor: pointer; padding: 6px 12px; border: 1px solid #fff; border-radius: 16px; }
.upload-label input { display: none; }
.feed { position: relative; height: 100vh; overflow: hidden; }
.feed-empty { color: #999; padding: 20px; padding-top: 64px; }
.video-card { position: absolute; inset: 0; transition: transform .3s ease; }
.video-card video { width: 100%; height: 100%; object-fit: cover; }
.video-meta { position: absolute; left: 16px; bottom: 24px; cursor: pointer; text-shadow: 0 1px 2px #000; }
.controls { position: fixed; right: 16px; top: 50%; display: flex; flex-direction: column; gap: 8px; z-index: 10; }
.controls button { font-size: 1.2rem; width: 44px; height: 44px; border-radius: 50%; border: 0; }
"#;

const PAGE_SCRIPT: &str = r#"
(() => {
  'use strict';
  const container = document.getElementById('videosContainer');
  const status = document.getElementById('uploadStatus');
  const fileInput = document.getElementById('fileInput');
  const session = document.body.dataset.session;
  const headers = { 'x-feed-session': session };

  const playActive = () => {
    const active = container.querySelector('video[data-active="true"]');
    if (active) active.play().catch(() => {});
  };
  const paint = (state) => {
    container.innerHTML = state.html;
    status.textContent = state.uploadStatus;
    playActive();
  };
  // The server forgets idle sessions; a fresh page load opens a new one.
  const expired = (res) => {
    if (res.status === 404 && res.headers.get('x-feed-session-expired')) {
      location.reload();
      return true;
    }
    return false;
  };
  const post = (url) =>
    fetch(url, { method: 'POST', headers })
      .then((res) => {
        if (expired(res)) return null;
        return res.ok ? res.json().then(paint) : null;
      })
      .catch((err) => console.error(err));

  document.getElementById('nextBtn').addEventListener('click', () => post('/api/feed/next'));
  document.getElementById('prevBtn').addEventListener('click', () => post('/api/feed/prev'));
  container.addEventListener('click', (e) => {
    const meta = e.target.closest('[data-like]');
    if (!meta) return;
    e.stopPropagation();
    post('/api/videos/' + encodeURIComponent(meta.dataset.like) + '/like');
  });

  fileInput.addEventListener('change', async (e) => {
    const file = e.target.files[0];
    if (!file) return;
    const form = new FormData();
    form.append('file', file);
    try {
      const res = await fetch('/api/upload', { method: 'POST', headers, body: form });
      if (expired(res)) return;
      const body = await res.json();
      if (res.status === 412) {
        alert(body.detail);
      } else if (res.ok) {
        paint(body);
      }
    } catch (err) {
      console.error(err);
    } finally {
      e.target.value = null;
    }
  });

  const connect = () => {
    const scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
    const ws = new WebSocket(
      scheme + location.host + '/ws/feed?session=' + encodeURIComponent(session));
    ws.onmessage = (m) => paint(JSON.parse(m.data));
    ws.onclose = () =>
      setTimeout(() => {
        fetch('/api/feed', { headers })
          .then((res) => {
            if (!expired(res)) connect();
          })
          .catch(() => setTimeout(connect, 2000));
      }, 2000);
  };
  connect();
  playActive();
})();
"#;
