use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// An entry in a folder listing or the result of a file operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = ".tag", rename_all = "lowercase")]
pub enum Metadata {
    File(FileMetadata),
    Folder(FolderMetadata),
    Deleted(DeletedMetadata),
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct FileMetadata {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub path_lower: Option<String>,
    #[serde(default)]
    pub path_display: Option<String>,
    pub client_modified: DateTime<Utc>,
    pub server_modified: DateTime<Utc>,
    #[serde(default)]
    pub rev: Option<String>,
    pub size: u64,
    #[serde(default)]
    pub content_hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct FolderMetadata {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub path_lower: Option<String>,
    #[serde(default)]
    pub path_display: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct DeletedMetadata {
    pub name: String,
    #[serde(default)]
    pub path_display: Option<String>,
}

/// Request body for POST /files/list_folder.
#[derive(Debug, Serialize)]
pub struct ListFolderArg<'a> {
    pub path: &'a str,
    pub recursive: bool,
    pub include_deleted: bool,
}

/// Request body for POST /files/list_folder/continue.
#[derive(Debug, Serialize)]
pub struct ListFolderContinueArg<'a> {
    pub cursor: &'a str,
}

/// One page of a folder listing.
#[derive(Debug, Deserialize)]
pub struct ListFolderResult {
    pub entries: Vec<Metadata>,
    pub cursor: String,
    pub has_more: bool,
}

/// Request body for POST /files/create_folder_v2.
#[derive(Debug, Serialize)]
pub struct CreateFolderArg<'a> {
    pub path: &'a str,
    pub autorename: bool,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct CreateFolderResult {
    pub metadata: FolderMetadata,
}

/// Request body for POST /files/delete_v2.
#[derive(Debug, Serialize)]
pub struct DeleteArg<'a> {
    pub path: &'a str,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct DeleteResult {
    pub metadata: Metadata,
}

/// `Dropbox-API-Arg` for POST /files/download.
#[derive(Debug, Serialize)]
pub struct DownloadArg<'a> {
    pub path: &'a str,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    Overwrite,
}

/// Where and how an uploaded file is committed.
#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo {
    pub path: String,
    pub mode: WriteMode,
    pub autorename: bool,
    #[serde(serialize_with = "serialize_dropbox_time")]
    pub client_modified: DateTime<Utc>,
    pub mute: bool,
}

impl CommitInfo {
    /// Overwrite whatever is at `path`, without notifying the user's devices.
    pub fn overwrite(path: &str, client_modified: DateTime<Utc>) -> Self {
        Self {
            path: path.to_string(),
            mode: WriteMode::Overwrite,
            autorename: false,
            client_modified,
            mute: true,
        }
    }
}

/// `Dropbox-API-Arg` for POST /files/upload_session/start.
#[derive(Debug, Serialize)]
pub struct UploadSessionStartArg {
    pub close: bool,
}

#[derive(Debug, Deserialize)]
pub struct UploadSessionStartResult {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadSessionCursor {
    pub session_id: String,
    pub offset: u64,
}

/// `Dropbox-API-Arg` for POST /files/upload_session/append_v2.
#[derive(Debug, Serialize)]
pub struct UploadSessionAppendArg {
    pub cursor: UploadSessionCursor,
    pub close: bool,
}

/// `Dropbox-API-Arg` for POST /files/upload_session/finish.
#[derive(Debug, Serialize)]
pub struct UploadSessionFinishArg {
    pub cursor: UploadSessionCursor,
    pub commit: CommitInfo,
}

/// Response of POST /users/get_current_account (the fields we log).
#[derive(Debug, Deserialize)]
pub struct FullAccount {
    pub name: AccountName,
    pub email: String,
    #[serde(default)]
    pub country: Option<String>,
    pub locale: String,
}

#[derive(Debug, Deserialize)]
pub struct AccountName {
    pub display_name: String,
}

/// Error body returned with 4xx/5xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error_summary: String,
}

/// Dropbox accepts timestamps as `YYYY-MM-DDTHH:MM:SSZ` only.
fn serialize_dropbox_time<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&t.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_folder_page() {
        let body = r#"{
            "entries": [
                {
                    ".tag": "file",
                    "name": "Prime_Numbers.txt",
                    "id": "id:a4ayc_80_OEAAAAAAAAAXw",
                    "client_modified": "2015-05-12T15:50:38Z",
                    "server_modified": "2015-05-12T15:50:38Z",
                    "rev": "a1c10ce0dd78",
                    "size": 7212,
                    "path_lower": "/homework/math/prime_numbers.txt",
                    "path_display": "/Homework/math/Prime_Numbers.txt",
                    "is_downloadable": true,
                    "content_hash": "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
                },
                {
                    ".tag": "folder",
                    "name": "math",
                    "id": "id:a4ayc_80_OEAAAAAAAAAXz",
                    "path_lower": "/homework/math",
                    "path_display": "/Homework/math"
                },
                {
                    ".tag": "deleted",
                    "name": "old.txt",
                    "path_lower": "/homework/old.txt",
                    "path_display": "/Homework/old.txt"
                }
            ],
            "cursor": "ZtkX9_EHj3x7PMkVuFIhwKYXEpwpLwyxp9vMKomUhllil9q7eWiAu",
            "has_more": false
        }"#;

        let page: ListFolderResult = serde_json::from_str(body).unwrap();
        assert!(!page.has_more);
        assert_eq!(page.entries.len(), 3);
        match &page.entries[0] {
            Metadata::File(file) => {
                assert_eq!(file.size, 7212);
                assert_eq!(file.client_modified.timestamp(), 1_431_445_838);
                assert_eq!(
                    file.path_display.as_deref(),
                    Some("/Homework/math/Prime_Numbers.txt")
                );
            }
            other => panic!("expected file, got {other:?}"),
        }
        assert!(matches!(page.entries[1], Metadata::Folder(_)));
        assert!(matches!(page.entries[2], Metadata::Deleted(_)));
    }

    #[test]
    fn commit_info_uses_whole_second_timestamps() {
        let t = DateTime::parse_from_rfc3339("2024-03-01T10:20:30.750Z")
            .unwrap()
            .with_timezone(&Utc);
        let json = serde_json::to_value(CommitInfo::overwrite("/a.txt", t)).unwrap();
        assert_eq!(json["mode"], "overwrite");
        assert_eq!(json["client_modified"], "2024-03-01T10:20:30Z");
        assert_eq!(json["autorename"], false);
        assert_eq!(json["mute"], true);
    }

    #[test]
    fn parses_account() {
        let body = r#"{
            "account_id": "dbid:AAH4f99T0taONIb-OurWxbNQ6ywGRopQngc",
            "name": {"given_name": "Franz", "surname": "Ferdinand", "display_name": "Franz Ferdinand (Personal)"},
            "email": "franz@example.com",
            "country": "US",
            "locale": "en"
        }"#;
        let account: FullAccount = serde_json::from_str(body).unwrap();
        assert_eq!(account.name.display_name, "Franz Ferdinand (Personal)");
        assert_eq!(account.country.as_deref(), Some("US"));
    }

    #[test]
    fn session_finish_nests_cursor_and_commit() {
        let arg = UploadSessionFinishArg {
            cursor: UploadSessionCursor {
                session_id: "s1".into(),
                offset: 42,
            },
            commit: CommitInfo::overwrite("/big.bin", DateTime::<Utc>::UNIX_EPOCH),
        };
        let json = serde_json::to_value(&arg).unwrap();
        assert_eq!(json["cursor"]["offset"], 42);
        assert_eq!(json["commit"]["path"], "/big.bin");
        assert_eq!(json["commit"]["client_modified"], "1970-01-01T00:00:00Z");
    }
}
