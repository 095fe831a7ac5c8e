//! Google Workspace directory source.
//!
//! Lists the users of one domain through the Admin SDK Directory API and keeps
//! those that carry the configured custom schema. The schema's
//! `Public_SSH_Key` field becomes the identity's public key.
//!
//! The access token is read from the credentials file as-is. Obtaining it
//! (service-account JWT exchange, admin impersonation) happens outside this
//! crate.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use usersync_core::{Identity, IdentitySource, Provider, SourceError, Username};

pub const USERS_ENDPOINT: &str = "https://admin.googleapis.com/admin/directory/v1/users";
pub const PAGE_SIZE: u32 = 500;
/// Field inside the custom schema that holds the key.
pub const PUBLIC_KEY_FIELD: &str = "Public_SSH_Key";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One page of `users.list`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersPage {
    #[serde(default)]
    pub users: Vec<DirectoryUser>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    #[serde(default)]
    pub primary_email: String,
    #[serde(default)]
    pub name: PersonName,
    #[serde(default)]
    pub custom_schemas: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonName {
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
}

#[derive(Deserialize)]
struct TokenFile {
    access_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

pub struct GoogleWorkspaceSource {
    agent: ureq::Agent,
    endpoint: String,
    credentials: PathBuf,
    domain: String,
    schema: String,
}

impl GoogleWorkspaceSource {
    pub fn new(credentials: PathBuf, domain: String, schema: String) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build();
        Self {
            agent,
            endpoint: USERS_ENDPOINT.to_string(),
            credentials,
            domain,
            schema,
        }
    }

    /// Point the source at a different users endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn fetch_page(&self, token: &str, page_token: Option<&str>) -> Result<UsersPage, SourceError> {
        let mut request = self
            .agent
            .get(&self.endpoint)
            .set("Authorization", &format!("Bearer {token}"))
            .query("domain", &self.domain)
            .query("projection", "custom")
            .query("customFieldMask", &self.schema)
            .query("maxResults", &PAGE_SIZE.to_string());
        if let Some(page_token) = page_token {
            request = request.query("pageToken", page_token);
        }

        let body = match request.call() {
            Ok(response) => response.into_string().map_err(|e| SourceError::Request {
                url: self.endpoint.clone(),
                message: e.to_string(),
            })?,
            Err(ureq::Error::Status(status, response)) => {
                return Err(SourceError::Status {
                    url: self.endpoint.clone(),
                    status,
                    body: response.into_string().unwrap_or_default(),
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(SourceError::Request {
                    url: self.endpoint.clone(),
                    message: transport.to_string(),
                });
            }
        };
        parse_page(&body)
    }
}

impl IdentitySource for GoogleWorkspaceSource {
    fn provider(&self) -> Provider {
        Provider::GSuite
    }

    fn fetch(&self) -> Result<Vec<Identity>, SourceError> {
        let token = read_access_token(&self.credentials)?;
        tracing::debug!(domain = %self.domain, schema = %self.schema, "listing directory users");
        let users = collect_pages(|page_token| self.fetch_page(&token, page_token))?;
        tracing::debug!(count = users.len(), "directory users listed");
        Ok(identities_from_users(&users, &self.schema))
    }
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Read the bearer token: either the bare token or JSON with `access_token`.
pub fn read_access_token(path: &Path) -> Result<String, SourceError> {
    let contents = std::fs::read_to_string(path).map_err(|e| SourceError::io(path, e))?;
    let contents = contents.trim();

    let token = if contents.starts_with('{') {
        let parsed: TokenFile = serde_json::from_str(contents)
            .map_err(|e| SourceError::Decode(format!("{}: {e}", path.display())))?;
        parsed.access_token.unwrap_or_default()
    } else {
        contents.to_string()
    };

    if token.trim().is_empty() {
        return Err(SourceError::MissingToken {
            path: path.to_path_buf(),
        });
    }
    Ok(token.trim().to_string())
}

pub fn parse_page(body: &str) -> Result<UsersPage, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))
}

/// Call `fetch` with each `nextPageToken` until a page comes back without one.
pub fn collect_pages<F>(mut fetch: F) -> Result<Vec<DirectoryUser>, SourceError>
where
    F: FnMut(Option<&str>) -> Result<UsersPage, SourceError>,
{
    let mut users = Vec::new();
    let mut next: Option<String> = None;
    loop {
        let page = fetch(next.as_deref())?;
        users.extend(page.users);
        match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(token) => next = Some(token),
            None => return Ok(users),
        }
    }
}

/// Keep users that carry `schema`, named `given.family` in lowercase.
pub fn identities_from_users(users: &[DirectoryUser], schema: &str) -> Vec<Identity> {
    let mut identities = Vec::new();
    for user in users {
        let Some(fields) = user.custom_schemas.get(schema) else {
            continue;
        };
        let username = Username::from(format!(
            "{}.{}",
            user.name.given_name, user.name.family_name
        ));
        if !username.is_valid_account_name() {
            tracing::warn!(
                user = %user.primary_email,
                derived = %username,
                "skipping directory user: derived name is not a valid account name"
            );
            continue;
        }
        let public_key = fields
            .get(PUBLIC_KEY_FIELD)
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        identities.push(Identity::new(username, public_key));
    }
    identities
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PAGE: &str = r#"{
        "kind": "admin#directory#users",
        "users": [
            {
                "primaryEmail": "alice@example.com",
                "name": { "givenName": "Alice", "familyName": "Smith" },
                "customSchemas": { "SSHKEY": { "Public_SSH_Key": "ssh-ed25519 AAAA alice" } }
            },
            {
                "primaryEmail": "bob@example.com",
                "name": { "givenName": "Bob", "familyName": "Jones" }
            },
            {
                "primaryEmail": "carol@example.com",
                "name": { "givenName": "Carol", "familyName": "White" },
                "customSchemas": { "SSHKEY": {} }
            }
        ],
        "nextPageToken": "page-2"
    }"#;

    #[test]
    fn users_without_schema_are_dropped() {
        let page = parse_page(PAGE).expect("parse");
        let identities = identities_from_users(&page.users, "SSHKEY");
        assert_eq!(
            identities,
            vec![
                Identity::new("alice.smith", "ssh-ed25519 AAAA alice"),
                Identity::new("carol.white", ""),
            ]
        );
        assert_eq!(page.next_page_token.as_deref(), Some("page-2"));
    }

    #[test]
    fn schema_name_is_configurable() {
        let page = parse_page(PAGE).expect("parse");
        assert!(identities_from_users(&page.users, "OTHER").is_empty());
    }

    #[test]
    fn invalid_derived_names_are_skipped() {
        let body = r#"{ "users": [
            { "name": { "givenName": "Mary Ann", "familyName": "Smith" },
              "customSchemas": { "SSHKEY": { "Public_SSH_Key": "k" } } }
        ] }"#;
        let page = parse_page(body).expect("parse");
        assert!(identities_from_users(&page.users, "SSHKEY").is_empty());
    }

    #[test]
    fn empty_page_parses() {
        let page = parse_page(r#"{ "kind": "admin#directory#users" }"#).expect("parse");
        assert!(page.users.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        assert!(matches!(parse_page("<html>"), Err(SourceError::Decode(_))));
    }

    #[test]
    fn pages_are_followed_until_no_token() {
        let mut requested = Vec::new();
        let users = collect_pages(|token| {
            requested.push(token.map(str::to_string));
            let next = match token {
                None => Some("p2".to_string()),
                Some("p2") => Some(String::new()),
                Some(other) => panic!("unexpected page token {other}"),
            };
            Ok(UsersPage {
                users: vec![DirectoryUser::default()],
                next_page_token: next,
            })
        })
        .expect("collect");
        assert_eq!(users.len(), 2);
        assert_eq!(requested, vec![None, Some("p2".to_string())]);
    }

    #[test]
    fn page_failure_aborts_collection() {
        let err = collect_pages(|_| {
            Err(SourceError::Status {
                url: USERS_ENDPOINT.into(),
                status: 403,
                body: "forbidden".into(),
            })
        })
        .unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 403, .. }));
    }

    #[test]
    fn token_file_accepts_bare_and_json_tokens() {
        let mut bare = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(bare, "  ya29.bare-token  ").expect("write");
        assert_eq!(read_access_token(bare.path()).expect("bare"), "ya29.bare-token");

        let mut json = tempfile::NamedTempFile::new().expect("tempfile");
        write!(json, r#"{{"access_token":"ya29.json","expires_in":3599}}"#).expect("write");
        assert_eq!(read_access_token(json.path()).expect("json"), "ya29.json");
    }

    #[test]
    fn token_file_without_token_is_rejected() {
        let mut json = tempfile::NamedTempFile::new().expect("tempfile");
        write!(json, r#"{{"token_type":"Bearer"}}"#).expect("write");
        assert!(matches!(
            read_access_token(json.path()),
            Err(SourceError::MissingToken { .. })
        ));
    }

    #[test]
    fn unreachable_endpoint_is_a_request_error() {
        let mut token = tempfile::NamedTempFile::new().expect("tempfile");
        write!(token, "t").expect("write");
        let source = GoogleWorkspaceSource::new(
            token.path().to_path_buf(),
            "example.com".into(),
            "SSHKEY".into(),
        )
        .with_endpoint("http://127.0.0.1:9/admin/directory/v1/users");
        assert!(matches!(source.fetch(), Err(SourceError::Request { .. })));
    }
}
