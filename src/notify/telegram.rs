//! [Notifier] sending reports through the Telegram Bot API.

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::{multipart, Client};
use serde::Deserialize;

use super::{Notifier, NotifyError};
use crate::config::TelegramConfig;

const API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Characters reserved by Telegram's MarkdownV2.
const MARKDOWN_V2_RESERVED: &str = r"\_*[]()~`>#+-=|{}.!";

static MARKDOWN_V2_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("([{}])", regex::escape(MARKDOWN_V2_RESERVED)))
        .expect("escaped character class should be valid")
});

/// Escape every MarkdownV2 reserved character in `text`.
pub fn escape_markdown_v2(text: &str) -> String {
    MARKDOWN_V2_ESCAPE.replace_all(text, r"\$1").into_owned()
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram bot sending to a single chat.
#[derive(Debug, Clone)]
pub struct Telegram {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl Telegram {
    pub fn new(config: &TelegramConfig) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_base: API_BASE.to_string(),
            token: config.token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    /// Talk to a different Bot API server, e.g. a self hosted one.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base.trim_end_matches('/'),
            self.token,
            method
        )
    }

    fn check(method: &'static str, response: reqwest::blocking::Response) -> Result<(), NotifyError> {
        let body: ApiResponse = response.json()?;
        if body.ok {
            Ok(())
        } else {
            Err(NotifyError::Api {
                method,
                description: body.description.unwrap_or_default(),
            })
        }
    }

    fn send_message(&self, text: &str, parse_mode: Option<&str>) -> Result<(), NotifyError> {
        let mut body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
        });
        if let Some(parse_mode) = parse_mode {
            body["parse_mode"] = parse_mode.into();
        }

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()?;
        Self::check("sendMessage", response)
    }

    fn send_document(&self, path: &Path) -> Result<(), NotifyError> {
        let form = multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .file("document", path)?;

        let response = self
            .client
            .post(self.api_url("sendDocument"))
            .multipart(form)
            .send()?;
        Self::check("sendDocument", response)
    }
}

impl Notifier for Telegram {
    fn send(&self, message: &str, attachment: Option<&Path>) -> Result<(), NotifyError> {
        let escaped = escape_markdown_v2(message);
        match self.send_message(&escaped, Some("MarkdownV2")) {
            Ok(()) => log::info!(target: "notify::telegram", "Telegram message sent"),
            Err(e) => {
                log::error!(target: "notify::telegram", "Sending formatted Telegram message failed: {e}");
                self.send_message(message, None)?;
                log::info!(target: "notify::telegram", "Telegram message sent without formatting");
            }
        }

        match attachment {
            Some(path) if path.exists() => {
                self.send_document(path)?;
                log::info!(target: "notify::telegram", "Attachment {} sent", path.display());
            }
            Some(path) => {
                log::warn!(target: "notify::telegram", "Attachment not found: {}", path.display());
            }
            None => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::thread;

    use serde_json::Value;

    use super::*;

    #[derive(Debug)]
    struct Request {
        path: String,
        body: String,
    }

    /// Local Bot API answering each connection with the next queued `(status, body)`.
    fn serve(responses: Vec<(u16, &'static str)>) -> (String, mpsc::Receiver<Request>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                tx.send(read_request(&stream)).unwrap();
                let response = format!(
                    "HTTP/1.1 {status} Stub\r\n\
                     Content-Type: application/json\r\n\
                     Content-Length: {}\r\n\
                     Connection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
        });

        (url, rx)
    }

    fn read_request(stream: &TcpStream) -> Request {
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let path = line.split_whitespace().nth(1).unwrap().to_string();

        let mut content_length = None;
        let mut chunked = false;
        loop {
            line.clear();
            reader.read_line(&mut line).unwrap();
            let header = line.trim_end();
            if header.is_empty() {
                break;
            }
            let (name, value) = header.split_once(':').unwrap();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = Some(value.trim().parse::<usize>().unwrap());
            } else if name.eq_ignore_ascii_case("transfer-encoding") {
                chunked = value.trim().eq_ignore_ascii_case("chunked");
            }
        }

        let mut body = Vec::new();
        if chunked {
            loop {
                line.clear();
                reader.read_line(&mut line).unwrap();
                let size = line.trim_end().split(';').next().unwrap();
                let size = usize::from_str_radix(size, 16).unwrap();
                let mut chunk = vec![0; size + 2];
                reader.read_exact(&mut chunk).unwrap();
                if size == 0 {
                    break;
                }
                body.extend_from_slice(&chunk[..size]);
            }
        } else if let Some(length) = content_length {
            body.resize(length, 0);
            reader.read_exact(&mut body).unwrap();
        }

        Request {
            path,
            body: String::from_utf8_lossy(&body).into_owned(),
        }
    }

    fn local_telegram(url: &str) -> Telegram {
        Telegram {
            client: Client::builder().no_proxy().timeout(REQUEST_TIMEOUT).build().unwrap(),
            ..telegram()
        }
        .with_api_base(url)
    }

    const REJECTED: (u16, &str) = (400, r#"{"ok":false,"description":"Bad Request: can't parse entities"}"#);
    const ACCEPTED: (u16, &str) = (200, r#"{"ok":true,"result":{}}"#);

    fn telegram() -> Telegram {
        Telegram::new(&TelegramConfig {
            token: "123:abc".into(),
            chat_id: "-1001".into(),
        })
        .unwrap()
    }

    #[test]
    fn escapes_reserved_characters() {
        assert_eq!(escape_markdown_v2("plain text"), "plain text");
        assert_eq!(escape_markdown_v2("1.5 KB"), r"1\.5 KB");
        assert_eq!(escape_markdown_v2("error_users_1.txt"), r"error\_users\_1\.txt");
        assert_eq!(escape_markdown_v2("`mongodump` (x) [y]!"), r"\`mongodump\` \(x\) \[y\]\!");
        assert_eq!(escape_markdown_v2(r"a\b"), r"a\\b");
        assert_eq!(escape_markdown_v2("- a"), r"\- a");
    }

    #[test]
    fn api_urls() {
        let bot = telegram();
        assert_eq!(
            bot.api_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
        let bot = bot.with_api_base("http://localhost:8081/");
        assert_eq!(
            bot.api_url("sendDocument"),
            "http://localhost:8081/bot123:abc/sendDocument"
        );
    }

    #[test]
    fn rejected_markdown_is_resent_as_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let attachment = dir.path().join("error_users_20250615_030405.txt");
        std::fs::write(&attachment, "Failed: auth error").unwrap();
        let (url, requests) = serve(vec![REJECTED, ACCEPTED, ACCEPTED]);

        let message = "Total size: 1.5 KB (done!)";
        local_telegram(&url).send(message, Some(&attachment)).unwrap();

        let requests: Vec<_> = requests.try_iter().collect();
        let paths: Vec<_> = requests.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "/bot123:abc/sendMessage",
                "/bot123:abc/sendMessage",
                "/bot123:abc/sendDocument"
            ]
        );

        let formatted: Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(formatted["parse_mode"], "MarkdownV2");
        assert_eq!(formatted["text"], r"Total size: 1\.5 KB \(done\!\)");
        assert_eq!(formatted["chat_id"], "-1001");

        let plain: Value = serde_json::from_str(&requests[1].body).unwrap();
        assert!(plain.get("parse_mode").is_none());
        assert_eq!(plain["text"], message);

        let document = &requests[2].body;
        assert!(document.contains(r#"name="chat_id""#));
        assert!(document.contains("-1001"));
        assert!(document.contains(r#"name="document""#));
        assert!(document.contains("Failed: auth error"));
    }

    #[test]
    fn accepted_markdown_is_sent_once() {
        let dir = tempfile::tempdir().unwrap();
        let (url, requests) = serve(vec![ACCEPTED]);

        let missing = dir.path().join("gone.txt");
        local_telegram(&url).send("all good", Some(&missing)).unwrap();

        let requests: Vec<_> = requests.try_iter().collect();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/bot123:abc/sendMessage");
    }

    #[test]
    fn rejected_plain_text_is_an_error() {
        let (url, requests) = serve(vec![REJECTED, REJECTED]);

        let err = local_telegram(&url).send("hello", None).unwrap_err();
        assert!(matches!(err, NotifyError::Api { method: "sendMessage", .. }));
        assert_eq!(requests.try_iter().count(), 2);
    }

    #[test]
    fn unreachable_api_is_an_error() {
        // port 9 (discard) on localhost is not expected to serve HTTP
        let bot = telegram().with_api_base("http://127.0.0.1:9");
        assert!(bot.send("hello", None).is_err());
    }
}
