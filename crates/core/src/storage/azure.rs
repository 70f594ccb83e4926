use std::time::Duration;

use async_trait::async_trait;
use quick_xml::{Reader, events::Event};
use reqwest::{Client, StatusCode, Url};

use crate::{
    error::{IngestError, Result},
    storage::BlobStore,
};

const API_VERSION: &str = "2021-08-06";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Azure Blob Storage over its REST API, authorized with a SAS token.
pub struct AzureBlobStore {
    client: Client,
    container_url: Url,
    sas: String,
}

impl AzureBlobStore {
    pub fn new(account_url: &str, container: &str, sas: String) -> Result<Self> {
        let mut container_url = Url::parse(account_url).map_err(|e| IngestError::Config {
            reason: format!("invalid storage account_url {account_url}: {e}"),
        })?;
        container_url
            .path_segments_mut()
            .map_err(|_| IngestError::Config {
                reason: format!("storage account_url {account_url} cannot be a base URL"),
            })?
            .pop_if_empty()
            .push(container);

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Ok(Self {
            client,
            container_url,
            sas: sas.trim_start_matches('?').to_string(),
        })
    }

    fn blob_url(&self, blob_path: &str) -> Url {
        let mut url = self.container_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(blob_path.split('/'));
        }
        url.set_query(Some(&self.sas));
        url
    }

    fn list_url(&self, prefix: &str, marker: Option<&str>) -> Url {
        let mut url = self.container_url.clone();
        url.set_query(Some(&self.sas));
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("restype", "container")
                .append_pair("comp", "list")
                .append_pair("prefix", prefix);
            if let Some(marker) = marker {
                query.append_pair("marker", marker);
            }
        }
        url
    }

    async fn check(blob_path: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(IngestError::BlobNotFound {
                path: blob_path.to_string(),
            });
        }
        let body = response.text().await.unwrap_or_default();
        Err(IngestError::Blob {
            path: blob_path.to_string(),
            reason: format!("{status}: {body}"),
        })
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn download(&self, path: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.blob_url(path))
            .header("x-ms-version", API_VERSION)
            .send()
            .await?;
        let response = Self::check(path, response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn upload(&self, path: &str, data: Vec<u8>, overwrite: bool) -> Result<()> {
        let mut request = self
            .client
            .put(self.blob_url(path))
            .header("x-ms-version", API_VERSION)
            .header("x-ms-blob-type", "BlockBlob")
            .body(data);
        if !overwrite {
            request = request.header("If-None-Match", "*");
        }
        Self::check(path, request.send().await?).await?;
        Ok(())
    }

    async fn size(&self, path: &str) -> Result<u64> {
        let response = self
            .client
            .head(self.blob_url(path))
            .header("x-ms-version", API_VERSION)
            .send()
            .await?;
        let response = Self::check(path, response).await?;
        response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| IngestError::Blob {
                path: path.to_string(),
                reason: "missing Content-Length in blob properties".to_string(),
            })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.blob_url(path))
            .header("x-ms-version", API_VERSION)
            .send()
            .await?;
        Self::check(path, response).await?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let response = self
                .client
                .get(self.list_url(prefix, marker.as_deref()))
                .header("x-ms-version", API_VERSION)
                .send()
                .await?;
            let body = Self::check(prefix, response).await?.text().await?;
            let page = parse_list_page(&body).map_err(|reason| IngestError::Blob {
                path: prefix.to_string(),
                reason,
            })?;

            names.extend(page.names);
            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        names.sort();
        Ok(names)
    }
}

#[derive(Debug, Default, PartialEq)]
struct ListPage {
    names: Vec<String>,
    next_marker: Option<String>,
}

/// Pull blob names and the continuation marker out of a List Blobs response.
fn parse_list_page(xml: &str) -> std::result::Result<ListPage, String> {
    let mut reader = Reader::from_str(xml);

    let mut page = ListPage::default();
    let mut in_blob = false;
    let mut capturing = false;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"Blob" => in_blob = true,
                b"Name" if in_blob => {
                    capturing = true;
                    text.clear();
                }
                b"NextMarker" => {
                    capturing = true;
                    text.clear();
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"Blob" => in_blob = false,
                b"Name" if in_blob => {
                    capturing = false;
                    page.names.push(std::mem::take(&mut text));
                }
                b"NextMarker" => {
                    capturing = false;
                    if !text.is_empty() {
                        page.next_marker = Some(std::mem::take(&mut text));
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) if capturing => {
                text.push_str(&e.unescape().unwrap_or_default());
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parsing error: {e}")),
            _ => {}
        }
    }

    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> AzureBlobStore {
        AzureBlobStore::new(
            "https://acct.blob.core.windows.net/",
            "classes",
            "?sv=2022-11-02&sig=abc".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn blob_urls_escape_segments_and_carry_sas() {
        let url = store().blob_url("Intro_Bio_transcripts/lecture 1_transcription.txt");
        assert_eq!(
            url.as_str(),
            "https://acct.blob.core.windows.net/classes/Intro_Bio_transcripts/lecture%201_transcription.txt?sv=2022-11-02&sig=abc"
        );
    }

    #[test]
    fn list_url_appends_listing_parameters() {
        let url = store().list_url("Intro_Bio_partition_bucket/", Some("m1"));
        let query = url.query().unwrap();
        assert!(query.starts_with("sv=2022-11-02&sig=abc"));
        assert!(query.contains("restype=container"));
        assert!(query.contains("comp=list"));
        assert!(query.contains("prefix=Intro_Bio_partition_bucket%2F"));
        assert!(query.ends_with("marker=m1"));
    }

    #[test]
    fn parses_list_blobs_response() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
            <EnumerationResults ContainerName="classes">
              <Prefix>Intro_Bio_partition_bucket/</Prefix>
              <Blobs>
                <Blob><Name>Intro_Bio_partition_bucket/a.pdf</Name><Properties><Content-Length>10</Content-Length></Properties></Blob>
                <Blob><Name>Intro_Bio_partition_bucket/lecture 2_transcription.txt</Name></Blob>
              </Blobs>
              <NextMarker>token-2</NextMarker>
            </EnumerationResults>"#;

        let page = parse_list_page(xml).unwrap();
        assert_eq!(
            page.names,
            vec![
                "Intro_Bio_partition_bucket/a.pdf".to_string(),
                "Intro_Bio_partition_bucket/lecture 2_transcription.txt".to_string(),
            ]
        );
        assert_eq!(page.next_marker.as_deref(), Some("token-2"));

        let last = parse_list_page("<EnumerationResults><Blobs/><NextMarker/></EnumerationResults>")
            .unwrap();
        assert_eq!(last, ListPage::default());
    }
}
