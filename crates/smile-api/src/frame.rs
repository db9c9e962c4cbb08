use axum::{extract::State, response::Html};

use crate::state::AppState;

const OG_TITLE: &str = "Join the $SMILE Whitelist!";
const PAGE_TITLE: &str = "$SMILE Whitelist Frame";
const BUTTON_LABEL: &str = "👋 I want to join!";
const MINI_APP_NAME: &str = "$SMILE Whitelist MVP";
const MINI_APP_BACKGROUND: &str = "#FFFBEA";

const FRAME_IMAGE_PATH: &str = "/images/frame-principal.png";
const MINI_APP_ICON_PATH: &str = "/images/miniapp-icono.png";
const MINI_APP_SPLASH_PATH: &str = "/images/miniapp-splash.png";
const MINI_APP_ENTRY_PATH: &str = "/index.html";

/// GET /api/frame: the frame document for this deployment.
pub async fn frame(State(state): State<AppState>) -> Html<String> {
    Html(render_frame(&state.base_url))
}

/// Render the frame document. Output depends only on `base_url`.
pub fn render_frame(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    let base = escape_attr(base_url);
    let frame_image = escape_attr(&format!("{base_url}{FRAME_IMAGE_PATH}"));
    let icon = escape_attr(&format!("{base_url}{MINI_APP_ICON_PATH}"));
    let splash = escape_attr(&format!("{base_url}{MINI_APP_SPLASH_PATH}"));
    let target = escape_attr(&format!("{base_url}{MINI_APP_ENTRY_PATH}"));

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8" />
    <meta property="og:title" content="{OG_TITLE}" />
    <meta property="og:image" content="{frame_image}" />

    <meta property="fc:frame" content="vNext" />
    <meta property="fc:frame:image" content="{frame_image}" />
    <meta property="fc:frame:button:1" content="{BUTTON_LABEL}" />
    <meta property="fc:frame:button:1:action" content="miniapp" />
    <meta property="fc:frame:button:1:target" content="{target}" />

    <meta property="fc:frame:miniapp:name" content="{MINI_APP_NAME}" />
    <meta property="fc:frame:miniapp:image" content="{icon}" />
    <meta property="fc:frame:miniapp:splash_image" content="{splash}" />
    <meta property="fc:frame:miniapp:background_color" content="{MINI_APP_BACKGROUND}" />

    <title>{PAGE_TITLE}</title>
  </head>
  <body>
    <h1>$SMILE Whitelist Frame</h1>
    <p>This is the frame server. Interact with it through a Farcaster client.</p>
    <p>The Mini App opens at: <a href="{target}">{target}</a></p>
    <p>Detected base URL: {base}</p>
  </body>
</html>
"#
    )
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_frame_and_mini_app_metadata() {
        let html = render_frame("https://smile.example");
        assert!(html.contains(r#"<meta property="fc:frame" content="vNext" />"#));
        assert!(html.contains(
            r#"<meta property="og:image" content="https://smile.example/images/frame-principal.png" />"#
        ));
        assert!(html.contains(
            r#"<meta property="fc:frame:button:1:target" content="https://smile.example/index.html" />"#
        ));
        assert!(html.contains(r#"<meta property="fc:frame:button:1:action" content="miniapp" />"#));
        assert!(html.contains(
            r#"<meta property="fc:frame:miniapp:splash_image" content="https://smile.example/images/miniapp-splash.png" />"#
        ));
        assert!(html.contains(r##"content="#FFFBEA""##));
    }

    #[test]
    fn trailing_slash_does_not_double_up() {
        assert_eq!(render_frame("https://smile.example/"), render_frame("https://smile.example"));
    }

    #[test]
    fn base_url_is_attribute_escaped() {
        let html = render_frame(r#"https://evil.example/"><script>"#);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&quot;&gt;&lt;script&gt;"));
    }
}
