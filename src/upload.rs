use reqwest::Url;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::UploadError;
use crate::http::ApiClient;
use crate::session::Throttle;
use crate::timefmt::now_canonical;

/// Records that carry a submission timestamp set just before they are written.
pub trait Stamp {
    fn stamp(&mut self, written_at: String);
}

/// Raw JSON objects are written as they are, plus the stamp.
impl Stamp for Map<String, Value> {
    fn stamp(&mut self, written_at: String) {
        self.insert("written_at".to_string(), Value::String(written_at));
    }
}

/// POST every record to `url` in order, one request each.
///
/// The first failure aborts the batch; `UploadError::index` tells how many
/// records made it. There is no retry and no resume checkpoint, so re-running
/// after a failure resubmits the records before that index.
pub async fn upload_each<T, I>(
    client: &ApiClient,
    url: &Url,
    records: I,
    throttle: &mut Throttle,
) -> Result<usize, UploadError>
where
    T: Serialize + Stamp,
    I: IntoIterator<Item = T>,
{
    let mut written = 0usize;
    for mut record in records {
        record.stamp(now_canonical());
        client
            .post_unit(url.clone(), &record)
            .await
            .map_err(|source| UploadError {
                index: written,
                source,
            })?;
        written += 1;
        tracing::debug!(record = written, "record written");
        throttle.wait().await;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[derive(Debug, Serialize)]
    struct Note {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        written_at: Option<String>,
    }

    impl Stamp for Note {
        fn stamp(&mut self, written_at: String) {
            self.written_at = Some(written_at);
        }
    }

    fn notes(ids: &[&str]) -> Vec<Note> {
        ids.iter()
            .map(|id| Note {
                id: id.to_string(),
                written_at: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn writes_one_stamped_request_per_record_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/observations"))
            .respond_with(ResponseTemplate::new(201))
            .expect(3)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let url = client.url("observations").unwrap();
        let mut throttle = Throttle::new(Duration::ZERO);
        let written = upload_each(&client, &url, notes(&["a", "b", "c"]), &mut throttle)
            .await
            .unwrap();
        assert_eq!(written, 3);
        assert_eq!(throttle.waits(), 3);

        let requests = server.received_requests().await.unwrap();
        let bodies: Vec<Value> = requests.iter().map(|r| r.body_json().unwrap()).collect();
        let ids: Vec<&str> = bodies.iter().map(|b| b["id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        for body in &bodies {
            let stamp = body["written_at"].as_str().unwrap();
            assert!(stamp.ends_with(" UTC"), "unexpected stamp {stamp}");
        }
    }

    #[tokio::test]
    async fn raw_objects_keep_every_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/observations"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let record = json!({"id": 7, "id_type": "ec5_uuid", "location": {"latitude": 40.4}});
        let Value::Object(record) = record else {
            unreachable!()
        };
        let client = ApiClient::new(&server.uri()).unwrap();
        let url = client.url("observations").unwrap();
        let mut throttle = Throttle::new(Duration::ZERO);
        upload_each(&client, &url, vec![record], &mut throttle).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = requests[0].body_json().unwrap();
        assert_eq!(body["id"], 7);
        assert_eq!(body["id_type"], "ec5_uuid");
        assert_eq!(body["location"]["latitude"], 40.4);
        assert!(body["written_at"].as_str().unwrap().ends_with(" UTC"));
    }

    #[tokio::test]
    async fn first_failure_aborts_the_rest_of_the_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"id": "b"})))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let url = client.url("observations").unwrap();
        let mut throttle = Throttle::new(Duration::ZERO);
        let err = upload_each(&client, &url, notes(&["a", "b", "c"]), &mut throttle)
            .await
            .unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.source.status().map(|s| s.as_u16()), Some(500));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }
}
