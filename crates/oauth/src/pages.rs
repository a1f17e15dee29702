//! HTML shown in the browser tab that followed the provider redirect.

const STYLE: &str = "body{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Arial,sans-serif;\
background:#1a1a1a;color:#fff;padding:40px;text-align:center;margin:0}\
.container{max-width:600px;margin:0 auto;background:rgba(255,255,255,.05);padding:40px;border-radius:20px}\
.ok{color:#4ade80}.err{color:#ff4444}\
.info{background:rgba(0,0,0,.3);padding:20px;border-radius:10px;margin:20px 0;text-align:left}\
.row{margin:10px 0;display:flex;justify-content:space-between}.label{color:#9ca3af}.value{font-weight:bold}";

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

fn document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title><style>{STYLE}</style></head>\n<body><div class=\"container\">{body}</div></body>\n</html>\n",
        escape_html(title)
    )
}

/// Success page with a table of label/value rows. Values are escaped.
pub fn success_page(heading: &str, rows: &[(&str, String)], footer: &str) -> String {
    let rows: String = rows
        .iter()
        .map(|(label, value)| {
            format!(
                "<div class=\"row\"><span class=\"label\">{}</span><span class=\"value\">{}</span></div>",
                escape_html(label),
                escape_html(value)
            )
        })
        .collect();
    let body = format!(
        "<h1 class=\"ok\">&#10003; {}</h1><div class=\"info\">{rows}</div><p class=\"ok\">{}</p><p>You can close this window and return to the terminal.</p>",
        escape_html(heading),
        escape_html(footer)
    );
    document(heading, &body)
}

/// Failure page. `message` is escaped.
pub fn failure_page(heading: &str, message: &str) -> String {
    let body = format!(
        "<h1 class=\"err\">&#10007; {}</h1><p>{}</p><p>Check the console for more details.</p>",
        escape_html(heading),
        escape_html(message)
    );
    document(heading, &body)
}
