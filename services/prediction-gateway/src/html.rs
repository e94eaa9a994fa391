//! Minimal server-rendered pages.
use rul_core::Frame;

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

fn page(title: &str, body: &str) -> String {
    format!("<!doctype html><html><head><meta charset=\"utf-8\"><title>{}</title></head><body><h1>{}</h1>{body}</body></html>", escape(title), escape(title))
}

pub fn upload_form() -> String {
    page("Remaining Useful Life", concat!(
        "<form method=\"post\" action=\"/\" enctype=\"multipart/form-data\">",
        "<input type=\"file\" name=\"file\" accept=\".csv\"> <button type=\"submit\">Upload</button></form>",
        "<p><a href=\"/predict\">Predict on the default dataset</a></p>",
    ))
}

/// First `limit` rows of `frame` as a table, followed by a download link.
pub fn prediction_table(frame: &Frame, limit: usize) -> String {
    let mut body = format!("<p>{} rows predicted; showing {}.</p><p><a href=\"/download\">Download CSV</a></p><table border=\"1\"><tr>", frame.height(), frame.height().min(limit));
    for c in frame.columns() { body.push_str(&format!("<th>{}</th>", escape(c))); }
    body.push_str("</tr>");
    for i in 0..frame.height().min(limit) {
        body.push_str("<tr>");
        for v in frame.row(i) {
            if v.is_nan() { body.push_str("<td></td>"); } else { body.push_str(&format!("<td>{v:.4}</td>")); }
        }
        body.push_str("</tr>");
    }
    body.push_str("</table>");
    page("Predictions", &body)
}

pub fn message(title: &str, text: &str) -> String {
    page(title, &format!("<p>{}</p><p><a href=\"/\">Back</a></p>", escape(text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<a href='x'>&</a>"), "&lt;a href=&#39;x&#39;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn table_is_truncated() {
        let f = Frame::from_rows(vec!["s_2".into(), "RUL".into()], &[vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]]).unwrap();
        let html = prediction_table(&f, 2);
        assert_eq!(html.matches("<tr>").count(), 3);
        assert!(html.contains("<th>RUL</th>"));
        assert!(html.contains("3 rows predicted; showing 2"));
    }
}
