//! Server-side HTML for every page.
//!
//! - `index_page`: repository list, rendered once at start-up
//! - `log_page` / `tree_page`: cached per repository
//! - `commit_page` / `file_page`: rendered per request
//!
//! All text from git or the configuration goes through `escape`; path
//! segments placed in links go through `encode_path` as well.

use std::fmt::Write;

use crate::git::{CommitDetail, FileView, LogEntry, TreeEntry};
use crate::registry::RepositoryConfig;

pub const STYLESHEET: &str = "body {
	background-color: #fff;
	color: #000;
	font-family: monospace;
	font-size: 14px;
}

td, th {
	padding: 0 0.5em;
}

th {
	text-align: left;
}

tr:hover {
	background-color: #eee;
}

.num {
	text-align: right;
}

.desc {
	color: #444;
}
";

/// Escape text for use in element content and quoted attributes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape raw tool output, replacing invalid UTF-8.
pub fn escape_bytes(b: &[u8]) -> String {
    escape(&String::from_utf8_lossy(b))
}

/// Percent-encode everything outside the URL unreserved set, keeping `/`.
pub fn encode_path(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(b as char)
            }
            _ => {
                let _ = write!(out, "%{:02X}", b);
            }
        }
    }
    out
}

/// Wrap page content in the shared layout.
pub fn layout(title: &str, repo: Option<&RepositoryConfig>, content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 1024);

    out.push_str(
        "<!DOCTYPE html>\n<html lang=\"en\">\n\t<head>\n\t\t<meta charset=\"utf-8\">\n\
         \t\t<meta name=\"viewport\" \
         content=\"width=device-width, initial-scale=1, shrink-to-fit=no\">\n",
    );
    if let Some(first) = repo.and_then(|r| r.description.first()) {
        let _ = writeln!(out, "\t\t<meta name=\"description\" content=\"{}\">", escape(first));
    }
    let _ = write!(
        out,
        "\t\t<link rel=\"stylesheet\" type=\"text/css\" href=\"/style.css\">\n\
         \t\t<title>{}</title>\n\t</head>\n\t<body>\n",
        escape(title)
    );

    match repo {
        Some(repo) => {
            let name = escape(&repo.name);
            let href = escape(&encode_path(&repo.name));

            let _ = write!(out, "\t\t<p><b>{}</b>", name);
            if repo.bare {
                let _ = write!(out, " ({}, bare repository)", escape(&repo.git_ref));
            }
            out.push_str("</p>\n");

            for line in &repo.description {
                let _ = writeln!(out, "\t\t<p class=\"desc\">{}</p>", escape(line));
            }

            let _ = writeln!(
                out,
                "\t\t<p><a href=\"/{href}\">Log</a>\n\t\t\t| <a href=\"/{href}/files\">Files</a>\n\
                 \t\t\t| <a href=\"/\">&lt;&lt; Repositories</a></p>"
            );
        }
        None => {
            let _ = writeln!(out, "\t\t<p><b>{}</b></p>", escape(title));
        }
    }

    out.push_str("\t\t<hr>\n");
    out.push_str(content);
    out.push_str("\n\t</body>\n</html>\n");
    out
}

pub fn index_page<'a>(repos: impl IntoIterator<Item = &'a RepositoryConfig>) -> String {
    let mut content = String::from(
        "<table>\n\t<thead>\n\t\t<tr>\n\t\t\t<th>Name</th>\n\t\t\t<th>Description</th>\n\
         \t\t\t<th>Ref</th>\n\t\t</tr>\n\t</thead>\n\t<tbody>\n",
    );

    for repo in repos {
        let _ = write!(
            content,
            "\t\t<tr>\n\t\t\t<td><a href=\"/{}\">{}</a></td>\n\t\t\t<td>{}</td>\n\
             \t\t\t<td>{}{}</td>\n\t\t</tr>\n",
            escape(&encode_path(&repo.name)),
            escape(&repo.name),
            repo.description.first().map(|d| escape(d)).unwrap_or_default(),
            escape(&repo.git_ref),
            if repo.bare { " (bare)" } else { "" },
        );
    }

    content.push_str("\t</tbody>\n</table>");
    layout("Repositories", None, &content)
}

pub fn log_page(repo: &RepositoryConfig, entries: &[LogEntry]) -> String {
    let href = escape(&encode_path(&repo.name));
    let mut content = String::from(
        "<table>\n\t<thead>\n\t\t<tr>\n\t\t\t<th>Date</th>\n\t\t\t<th>Commit Message</th>\n\
         \t\t\t<th>Author</th>\n\t\t\t<th class=\"num\">Files</th>\n\
         \t\t\t<th class=\"num\">+</th>\n\
         \t\t\t<th class=\"num\">-</th>\n\t\t</tr>\n\t</thead>\n\t<tbody>\n",
    );

    for entry in entries {
        let _ = write!(
            content,
            "\t\t<tr>\n\t\t\t<td>{}</td>\n\t\t\t<td><a href=\"/{}/commit/{}\">{}</a></td>\n\
             \t\t\t<td>{}</td>\n\t\t\t<td class=\"num\">{}</td>\n\t\t\t<td class=\"num\">{}</td>\n\
             \t\t\t<td class=\"num\">{}</td>\n\t\t</tr>\n",
            entry.time.format("%Y-%m-%d %H:%M"),
            href,
            escape(&entry.hash),
            escape(&entry.subject),
            escape(&entry.author),
            entry.stat.changed,
            entry.stat.insertions(),
            entry.stat.deletions(),
        );
    }

    content.push_str("\t</tbody>\n</table>");
    layout(&format!("{} - Log", repo.name), Some(repo), &content)
}

pub fn tree_page(repo: &RepositoryConfig, entries: &[TreeEntry]) -> String {
    let href = escape(&encode_path(&repo.name));
    let mut content = String::from(
        "<table>\n\t<thead>\n\t\t<tr>\n\t\t\t<th>Mode</th>\n\t\t\t<th>Name</th>\n\
         \t\t\t<th class=\"num\">Size</th>\n\t\t</tr>\n\t</thead>\n\t<tbody>\n",
    );

    for entry in entries {
        let name = escape(&entry.name);
        // Bare repositories have no file pages.
        let cell = if repo.bare {
            name
        } else {
            format!(
                "<a href=\"/{}/file/{}\">{}</a>",
                href,
                escape(&encode_path(&entry.name)),
                name
            )
        };

        let _ = write!(
            content,
            "\t\t<tr>\n\t\t\t<td>{}</td>\n\t\t\t<td>{}</td>\n\
             \t\t\t<td class=\"num\">{}</td>\n\t\t</tr>\n",
            entry.mode_octal(),
            cell,
            entry.size,
        );
    }

    content.push_str("\t</tbody>\n</table>");
    layout(&format!("{} - Files", repo.name), Some(repo), &content)
}

pub fn commit_page(repo: &RepositoryConfig, hash: &str, detail: &CommitDetail) -> String {
    let content = format!(
        "<pre>{}</pre>\n\t<hr>\n\t<pre>{}</pre>\n\t<hr>\n\t<pre>{}</pre>",
        escape_bytes(&detail.cat_file),
        escape_bytes(&detail.diff_stat),
        escape_bytes(&detail.diff),
    );
    layout(&format!("{} - Commit {}", repo.name, hash), Some(repo), &content)
}

pub fn file_page(repo: &RepositoryConfig, path: &str, view: &FileView) -> String {
    let content = if repo.bare {
        "<p><b>(Cannot view files of bare repositories)</b></p>".to_string()
    } else {
        match &view.content {
            Some(content) if !view.binary => format!("<pre>{}</pre>", escape_bytes(content)),
            _ => "<p><b>(Binary file)</b></p>".to_string(),
        }
    };
    layout(&format!("{} - File {}", repo.name, path), Some(repo), &content)
}
