use actix_web::{http::header::ContentType, web, HttpResponse};

use crate::config::ClientSettings;
use crate::routes::AppState;

const INDEX_TEMPLATE: &str = include_str!("../../static/index.html");

/// Client-side routes that all serve the single-page client
pub const PAGE_PATHS: [&str; 5] = ["/", "/rag", "/dashboard", "/emails", "/upload"];

/// Pre-rendered client page
#[derive(Debug, Clone)]
pub struct Pages {
    index: String,
}

impl Pages {
    pub fn render(client: &ClientSettings) -> Self {
        Self {
            index: INDEX_TEMPLATE.replace("{{dashboard_url}}", &escape_attr(&client.dashboard_url)),
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    for path in PAGE_PATHS {
        cfg.route(path, web::get().to(index));
    }
}

async fn index(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(state.pages.index().to_owned())
}
