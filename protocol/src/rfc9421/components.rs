//! Covered request components and the signature base built from them.
//!
//! ```text
//! "@method": POST
//! "@authority": merchant.example
//! "@path": /checkout
//! "content-digest": sha-256=:X48E9q...:
//! "x-agent-session": 42
//! "@signature-params": ("@method" "@authority" "@path" "content-digest" "x-agent-session");created=1700000000;nonce="...";keyid="..."
//! ```
//!
//! Lines are joined with `\n`, no trailing newline. A name or value that
//! contains CR or LF could forge extra lines, so it is rejected outright.

use super::{compute_content_digest, Rfc9421Error};

/// The parts of an HTTP request that a signature covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestComponents {
    method: String,
    authority: String,
    path: String,
    content_digest: Option<String>,
    headers: Vec<(String, String)>,
}

impl RequestComponents {
    /// The method is normalised to uppercase.
    pub fn new(method: &str, authority: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            authority: authority.into(),
            path: path.into(),
            content_digest: None,
            headers: Vec::new(),
        }
    }

    /// Cover the body through its `Content-Digest`.
    pub fn with_body(mut self, body: &[u8]) -> Self {
        self.content_digest = Some(compute_content_digest(body));
        self
    }

    /// Cover a `Content-Digest` value computed elsewhere.
    pub fn with_content_digest(mut self, digest: impl Into<String>) -> Self {
        self.content_digest = Some(digest.into());
        self
    }

    /// Cover an additional header. The name is lowercased; order of calls
    /// is the order in the signature base.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content_digest(&self) -> Option<&str> {
        self.content_digest.as_deref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Reject anything that could not be serialised unambiguously.
    pub fn check(&self) -> Result<(), Rfc9421Error> {
        check_value("@method", &self.method)?;
        check_value("@authority", &self.authority)?;
        check_value("@path", &self.path)?;
        if let Some(digest) = &self.content_digest {
            check_value("content-digest", digest)?;
        }
        for (name, value) in &self.headers {
            if name.is_empty() {
                return Err(Rfc9421Error::InvalidComponent("empty header name".into()));
            }
            if has_line_break(name) || name.contains('"') || name.contains(' ') {
                return Err(Rfc9421Error::InvalidComponent("header name contains forbidden characters".into()));
            }
            check_value(name, value)?;
        }
        Ok(())
    }

    /// Component identifiers in signing order.
    pub fn covered(&self) -> Vec<&str> {
        let mut covered = vec!["@method", "@authority", "@path"];
        if self.content_digest.is_some() {
            covered.push("content-digest");
        }
        covered.extend(self.headers.iter().map(|(name, _)| name.as_str()));
        covered
    }

    /// `("@method" ...);created=<unix>;nonce="<nonce>";keyid="<key_id>"`
    pub fn signature_params(&self, created: i64, nonce: &str, key_id: &str) -> String {
        let list = self
            .covered()
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(" ");
        format!("({});created={};nonce=\"{}\";keyid=\"{}\"", list, created, nonce, key_id)
    }

    /// The exact bytes that get signed.
    pub fn signature_base(&self, params: &str) -> Result<String, Rfc9421Error> {
        self.check()?;
        let mut lines = Vec::with_capacity(5 + self.headers.len());
        lines.push(format!("\"@method\": {}", self.method));
        lines.push(format!("\"@authority\": {}", self.authority));
        lines.push(format!("\"@path\": {}", self.path));
        if let Some(digest) = &self.content_digest {
            lines.push(format!("\"content-digest\": {}", digest));
        }
        for (name, value) in &self.headers {
            lines.push(format!("\"{}\": {}", name, value));
        }
        lines.push(format!("\"@signature-params\": {}", params));
        Ok(lines.join("\n"))
    }
}

fn has_line_break(s: &str) -> bool {
    s.contains('\r') || s.contains('\n')
}

fn check_value(name: &str, value: &str) -> Result<(), Rfc9421Error> {
    if has_line_break(value) {
        return Err(Rfc9421Error::InvalidComponent(format!("{} contains a line break", name)));
    }
    Ok(())
}
