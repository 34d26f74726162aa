use crate::core::token_estimator::estimate_text_tokens;
use crate::domain::errors::ServiceError;
use crate::domain::models::{FileContent, FileTreeNode, PromptPayload, PromptResponse, RemoteFile};
use log::{debug, info};
use reqwest::blocking::{Client, Response, multipart};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

pub trait FileService {
    fn cwd(&self) -> Result<String, ServiceError>;
    fn list_files(&self) -> Result<Vec<RemoteFile>, ServiceError>;
    fn file_content(&self, path: &str) -> Result<FileContent, ServiceError>;
    fn directory_tree(&self, root_path: &str) -> Result<FileTreeNode, ServiceError>;
    fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<RemoteFile, ServiceError>;
    fn delete_file(&self, path: &str) -> Result<(), ServiceError>;
    fn compile_prompt(&self, payload: &PromptPayload) -> Result<PromptResponse, ServiceError>;
    fn suggestions(&self, payload: &PromptPayload) -> Result<Vec<String>, ServiceError>;
}

#[derive(Deserialize)]
struct CwdResponse {
    path: String,
}

#[derive(Deserialize)]
struct ContentEnvelope {
    content: ContentBody,
}

// Older backends return the text directly, newer ones wrap it with a token count.
#[derive(Deserialize)]
#[serde(untagged)]
enum ContentBody {
    Detailed(FileContent),
    Plain(String),
}

impl From<ContentBody> for FileContent {
    fn from(body: ContentBody) -> Self {
        match body {
            ContentBody::Detailed(content) => content,
            ContentBody::Plain(content) => FileContent {
                token_count: estimate_text_tokens(&content),
                content,
            },
        }
    }
}

pub struct HttpFileService {
    base_url: Url,
    client: Client,
}

impl HttpFileService {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8000/api";

    pub fn new(base_url: &str) -> Result<Self, ServiceError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ServiceError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(ServiceError::InvalidUrl(base_url.to_string()));
        }

        debug!("Using file service at {}", parsed);
        Ok(Self {
            base_url: parsed,
            client: Client::new(),
        })
    }

    /// Joins segments onto the base URL; each segment is percent-encoded whole,
    /// so a `/` inside a file path becomes `%2F`.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ServiceError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        subject: &str,
    ) -> Result<T, ServiceError> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);
        let response = self.client.get(url).send()?;
        read_json(response, subject)
    }

    fn post<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        payload: &PromptPayload,
    ) -> Result<T, ServiceError> {
        let url = self.endpoint(segments)?;
        debug!("POST {} ({} files)", url, payload.files.len());
        let response = self.client.post(url).json(payload).send()?;
        read_json(response, segments.join("/").as_str())
    }
}

fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn check_status(response: Response, subject: &str) -> Result<String, ServiceError> {
    let status = response.status();
    let body = response.text()?;

    if status == StatusCode::NOT_FOUND {
        return Err(ServiceError::NotFound(subject.to_string()));
    }
    if !status.is_success() {
        return Err(ServiceError::Status {
            status: status.as_u16(),
            detail: error_detail(&body),
        });
    }
    Ok(body)
}

fn read_json<T: DeserializeOwned>(response: Response, subject: &str) -> Result<T, ServiceError> {
    let body = check_status(response, subject)?;
    Ok(serde_json::from_str(&body)?)
}

impl FileService for HttpFileService {
    fn cwd(&self) -> Result<String, ServiceError> {
        let response: CwdResponse = self.get(&["files", "cwd"], "cwd")?;
        Ok(response.path)
    }

    fn list_files(&self) -> Result<Vec<RemoteFile>, ServiceError> {
        let files: Vec<RemoteFile> = self.get(&["files", "list"], "file list")?;
        info!("Listed {} remote files", files.len());
        Ok(files)
    }

    fn file_content(&self, path: &str) -> Result<FileContent, ServiceError> {
        let envelope: ContentEnvelope = self.get(&["files", "content", path], path)?;
        Ok(envelope.content.into())
    }

    fn directory_tree(&self, root_path: &str) -> Result<FileTreeNode, ServiceError> {
        let tree: FileTreeNode = self.get(&["files", "tree", root_path], root_path)?;
        info!("Fetched directory tree with {} files", tree.file_count());
        Ok(tree)
    }

    fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<RemoteFile, ServiceError> {
        let url = self.endpoint(&["files", "upload"])?;
        debug!("POST {} ({} bytes)", url, bytes.len());

        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);
        let response = self.client.post(url).multipart(form).send()?;

        let uploaded: RemoteFile = read_json(response, file_name)?;
        info!("Uploaded {} as {}", file_name, uploaded.path);
        Ok(uploaded)
    }

    fn delete_file(&self, path: &str) -> Result<(), ServiceError> {
        let url = self.endpoint(&["files", path])?;
        debug!("DELETE {}", url);
        let response = self.client.delete(url).send()?;
        check_status(response, path)?;
        info!("Deleted remote file {}", path);
        Ok(())
    }

    fn compile_prompt(&self, payload: &PromptPayload) -> Result<PromptResponse, ServiceError> {
        self.post(&["prompts", "compile"], payload)
    }

    fn suggestions(&self, payload: &PromptPayload) -> Result<Vec<String>, ServiceError> {
        self.post(&["prompts", "suggestions"], payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{NodeKind, SelectedFile};
    use mockito::{Matcher, Server};

    fn service(server: &Server) -> HttpFileService {
        HttpFileService::new(&format!("{}/api", server.url())).unwrap()
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            HttpFileService::new("not a url"),
            Err(ServiceError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpFileService::new("mailto:someone@example.com"),
            Err(ServiceError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_endpoint_encodes_path_as_one_segment() {
        let service = HttpFileService::new("http://localhost:8000/api/").unwrap();
        let url = service
            .endpoint(&["files", "content", "src/main file.rs"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/files/content/src%2Fmain%20file.rs"
        );
    }

    #[test]
    fn test_list_files() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/api/files/list")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"file_name": "a.py", "file_path": "uploads/a.py", "file_type": "py"}]"#,
            )
            .create();

        let files = service(&server).list_files().unwrap();
        mock.assert();
        assert_eq!(
            files,
            vec![RemoteFile {
                path: "uploads/a.py".to_string(),
                name: "a.py".to_string(),
                kind: "py".to_string(),
            }]
        );
    }

    #[test]
    fn test_file_content_detailed_and_plain() {
        let mut server = Server::new();
        let detailed = server
            .mock("GET", "/api/files/content/src%2Fmain.rs")
            .with_status(200)
            .with_body(r#"{"content": {"content": "fn main() {}", "token_count": 4}}"#)
            .create();
        let plain = server
            .mock("GET", "/api/files/content/notes.txt")
            .with_status(200)
            .with_body(r#"{"content": "abcdefgh"}"#)
            .create();

        let service = service(&server);
        let content = service.file_content("src/main.rs").unwrap();
        assert_eq!(content.content, "fn main() {}");
        assert_eq!(content.token_count, 4);

        let content = service.file_content("notes.txt").unwrap();
        assert_eq!(content.content, "abcdefgh");
        assert_eq!(content.token_count, 2);

        detailed.assert();
        plain.assert();
    }

    #[test]
    fn test_not_found_and_error_detail() {
        let mut server = Server::new();
        server
            .mock("GET", "/api/files/content/missing.txt")
            .with_status(404)
            .with_body(r#"{"detail": "File not found"}"#)
            .create();
        server
            .mock("GET", "/api/files/content/bad.bin")
            .with_status(400)
            .with_body(r#"{"detail": "cannot decode"}"#)
            .create();

        let service = service(&server);
        assert!(matches!(
            service.file_content("missing.txt"),
            Err(ServiceError::NotFound(path)) if path == "missing.txt"
        ));
        match service.file_content("bad.bin") {
            Err(ServiceError::Status { status, detail }) => {
                assert_eq!(status, 400);
                assert_eq!(detail, "cannot decode");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_directory_tree_and_cwd() {
        let mut server = Server::new();
        server
            .mock("GET", "/api/files/cwd")
            .with_status(200)
            .with_body(r#"{"path": "/srv/proj/server"}"#)
            .create();
        server
            .mock("GET", "/api/files/tree/%2Fsrv%2Fproj")
            .with_status(200)
            .with_body(
                r#"{"type": "directory", "name": "proj", "path": "/srv/proj", "children": [
                    {"type": "file", "name": "a.rs", "path": "/srv/proj/a.rs", "extension": "rs"}
                ]}"#,
            )
            .create();

        let service = service(&server);
        assert_eq!(service.cwd().unwrap(), "/srv/proj/server");

        let tree = service.directory_tree("/srv/proj").unwrap();
        assert_eq!(tree.kind, NodeKind::Directory);
        assert_eq!(tree.file_count(), 1);
    }

    #[test]
    fn test_delete_and_upload() {
        let mut server = Server::new();
        let delete = server
            .mock("DELETE", "/api/files/uploads%2Fa.py")
            .with_status(200)
            .with_body(r#"{"status": "success"}"#)
            .create();
        let upload = server
            .mock("POST", "/api/files/upload")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data".to_string()),
            )
            .match_body(Matcher::Regex("print\\(1\\)".to_string()))
            .with_status(200)
            .with_body(r#"{"file_name": "b.py", "file_path": "uploads/b.py", "file_type": "py"}"#)
            .create();

        let service = service(&server);
        service.delete_file("uploads/a.py").unwrap();
        let uploaded = service.upload_file("b.py", b"print(1)".to_vec()).unwrap();

        assert_eq!(uploaded.path, "uploads/b.py");
        delete.assert();
        upload.assert();
    }

    #[test]
    fn test_compile_and_suggestions_post_payload() {
        let mut server = Server::new();
        let compile = server
            .mock("POST", "/api/prompts/compile")
            .match_body(Matcher::PartialJsonString(
                r#"{"prompt_text": "Main", "system_prompt": "Sys"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(
                r#"{"compiled_prompt": "System Instructions:\nSys\n", "suggestions": ["Provide concrete examples"], "metadata": {"file_count": 1}}"#,
            )
            .create();
        let suggestions = server
            .mock("POST", "/api/prompts/suggestions")
            .with_status(200)
            .with_body(r#"["Break down into clear steps"]"#)
            .create();

        let service = service(&server);
        let files = vec![SelectedFile::new("f.txt", "X")];
        let payload = PromptPayload::new("Sys", "Main", &files);

        let response = service.compile_prompt(&payload).unwrap();
        assert_eq!(response.compiled_prompt, "System Instructions:\nSys\n");
        assert_eq!(response.suggestions, vec!["Provide concrete examples"]);
        assert_eq!(response.metadata["file_count"], 1);

        assert_eq!(
            service.suggestions(&payload).unwrap(),
            vec!["Break down into clear steps"]
        );
        compile.assert();
        suggestions.assert();
    }
}
