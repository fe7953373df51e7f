use crate::types::{ClassifiedItem, Priority, Recommendation, Renderer, ReportSnapshot, SourceKind};
use chrono::NaiveDate;
use html_escape::{encode_double_quoted_attribute, encode_text};

const STYLE: &str = r#"
body { font-family: -apple-system, "PingFang SC", "Microsoft YaHei", sans-serif; margin: 0; background: #f5f6f8; color: #222; }
header { background: #1f2937; color: #fff; padding: 24px 32px; }
header h1 { margin: 0 0 4px; font-size: 24px; }
main { max-width: 960px; margin: 0 auto; padding: 24px 16px; }
.stats { display: flex; gap: 12px; margin-bottom: 24px; }
.stat { flex: 1; background: #fff; border-radius: 8px; padding: 16px; text-align: center; }
.stat .num { font-size: 28px; font-weight: bold; }
.p1 .num { color: #dc2626; } .p2 .num { color: #d97706; } .p3 .num { color: #2563eb; }
section { background: #fff; border-radius: 8px; padding: 16px 20px; margin-bottom: 20px; }
.item { border-left: 3px solid #ddd; padding: 8px 12px; margin: 12px 0; }
.item .meta { color: #666; font-size: 12px; }
.item .fields { font-size: 13px; color: #444; }
.empty { color: #999; }
nav.history a { display: inline-block; margin: 4px 8px 4px 0; }
nav.history .current { font-weight: bold; }
"#;

/// Report file name for one date
pub fn report_file_name(date: NaiveDate) -> String {
    format!("report-{}.html", date.format("%Y-%m-%d"))
}

pub fn tier_heading(priority: Priority) -> &'static str {
    match priority {
        Priority::P1 => "P1 紧急",
        Priority::P2 => "P2 重要",
        Priority::P3 => "P3 一般",
    }
}

/// Self-contained HTML page per snapshot
#[derive(Debug, Default, Clone)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    pub fn new() -> Self {
        Self
    }

    fn render_stats(&self, snapshot: &ReportSnapshot, out: &mut String) {
        out.push_str("<div class=\"stats\">\n");
        out.push_str(&format!(
            "<div class=\"stat\"><div class=\"num\">{}</div><div>总计</div></div>\n",
            snapshot.total()
        ));
        for priority in Priority::ALL {
            out.push_str(&format!(
                "<div class=\"stat {}\"><div class=\"num\">{}</div><div>{}</div></div>\n",
                priority.as_str().to_lowercase(),
                snapshot.count(priority),
                tier_heading(priority)
            ));
        }
        out.push_str("</div>\n");
    }

    fn render_tier(&self, priority: Priority, items: &[ClassifiedItem], out: &mut String) {
        out.push_str(&format!(
            "<section class=\"tier {}\">\n<h2>{} ({})</h2>\n",
            priority.as_str().to_lowercase(),
            tier_heading(priority),
            items.len()
        ));

        if items.is_empty() {
            out.push_str("<p class=\"empty\">暂无内容</p>\n");
        }
        for item in items {
            self.render_item(item, out);
        }

        out.push_str("</section>\n");
    }

    fn render_item(&self, item: &ClassifiedItem, out: &mut String) {
        let source = match item.item.source_kind {
            SourceKind::Post => format!("@{}", item.item.author),
            SourceKind::Article => item.item.author.clone(),
        };
        let when = item
            .item
            .timestamp
            .map(|ts| ts.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_default();

        out.push_str("<div class=\"item\">\n");
        out.push_str(&format!(
            "<h3><a href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a></h3>\n",
            encode_double_quoted_attribute(&item.item.url),
            encode_text(&item.title)
        ));
        out.push_str(&format!(
            "<div class=\"meta\">[{}] {} {}",
            encode_text(&item.category),
            encode_text(&source),
            encode_text(&when)
        ));
        if !item.item.account_category.is_empty() {
            out.push_str(&format!(" · {}", encode_text(&item.item.account_category)));
        }
        out.push_str("</div>\n");
        out.push_str(&format!("<p>{}</p>\n", encode_text(&item.summary)));

        let mut fields = Vec::new();
        if let Some(impact) = &item.impact {
            fields.push(format!("影响: {}", encode_text(impact)));
        }
        if !item.affected_assets.is_empty() {
            fields.push(format!("涉及资产: {}", encode_text(&item.affected_assets.join(", "))));
        }
        if let Some(action) = &item.action {
            fields.push(format!("建议: {}", encode_text(action)));
        }
        if !fields.is_empty() {
            out.push_str(&format!("<div class=\"fields\">{}</div>\n", fields.join("<br>")));
        }

        out.push_str("</div>\n");
    }

    fn render_recommendations(&self, recommendations: &[Recommendation], out: &mut String) {
        out.push_str("<section class=\"recommendations\">\n<h2>推荐关注账号</h2>\n");
        if recommendations.is_empty() {
            out.push_str("<p class=\"empty\">暂无推荐</p>\n");
        } else {
            out.push_str("<ul>\n");
            for rec in recommendations {
                out.push_str(&format!(
                    "<li><a href=\"https://x.com/{}\" target=\"_blank\" rel=\"noopener\">@{}</a> [{}] {}</li>\n",
                    encode_double_quoted_attribute(&rec.handle),
                    encode_text(&rec.handle),
                    encode_text(&rec.category),
                    encode_text(&rec.reason)
                ));
            }
            out.push_str("</ul>\n");
        }
        out.push_str("</section>\n");
    }

    fn render_history(&self, snapshot: &ReportSnapshot, out: &mut String) {
        out.push_str("<section>\n<h2>历史报告</h2>\n<nav class=\"history\">\n");
        for entry in &snapshot.history_index {
            let label = entry.date.format("%Y-%m-%d").to_string();
            if entry.is_current {
                out.push_str(&format!("<span class=\"current\">{} (当前)</span>\n", label));
            } else {
                out.push_str(&format!("<a href=\"{}\">{}</a>\n", report_file_name(entry.date), label));
            }
        }
        out.push_str("</nav>\n</section>\n");
    }
}

impl Renderer for HtmlRenderer {
    fn render(&self, snapshot: &ReportSnapshot) -> anyhow::Result<String> {
        let date = snapshot.date.format("%Y-%m-%d");
        let mut out = String::with_capacity(16 * 1024);

        out.push_str("<!DOCTYPE html>\n<html lang=\"zh-CN\">\n<head>\n<meta charset=\"utf-8\">\n");
        out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
        out.push_str(&format!("<title>加密监管情报日报 {}</title>\n", date));
        out.push_str(&format!("<style>{}</style>\n</head>\n<body>\n", STYLE));
        out.push_str(&format!(
            "<header><h1>加密监管情报日报</h1><div>{} · 生成于 {}</div></header>\n<main>\n",
            date,
            snapshot.generated_at.format("%Y-%m-%d %H:%M UTC")
        ));

        self.render_stats(snapshot, &mut out);
        for priority in Priority::ALL {
            self.render_tier(priority, snapshot.items(priority), &mut out);
        }
        self.render_recommendations(&snapshot.recommendations, &mut out);
        self.render_history(snapshot, &mut out);

        out.push_str("</main>\n</body>\n</html>\n");
        Ok(out)
    }
}
