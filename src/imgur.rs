use serde_json::{json, Value};

const UPLOAD_URL: &str = "https://api.imgur.com/3/image";

/// Upload a base64 PNG to Imgur and return the hosted URL. The card embeds
/// a remote URL rather than vault-local data so the vision request can
/// reference the same link. Failure aborts the image path; the caller
/// notifies the user.
pub async fn upload_image(
    http: &reqwest::Client,
    client_id: &str,
    base64_image: &str,
) -> Result<String, String> {
    let resp = http
        .post(UPLOAD_URL)
        .header("Authorization", format!("Client-ID {}", client_id))
        .json(&json!({
            "image": base64_image,
            "type": "base64",
        }))
        .send()
        .await
        .map_err(|e| format!("Image upload failed: {}", e))?;

    let status = resp.status();
    let body: Value = resp
        .json()
        .await
        .map_err(|e| format!("Image host returned invalid JSON: {}", e))?;

    if !status.is_success() {
        return Err(format!(
            "Image host error (HTTP {}): {}",
            status.as_u16(),
            body.get("data")
                .and_then(|d| d.get("error"))
                .and_then(|e| e.as_str())
                .unwrap_or("unknown error")
        ));
    }

    extract_link(&body).ok_or_else(|| "Image host response missing data.link".to_string())
}

fn extract_link(response: &Value) -> Option<String> {
    response
        .get("data")
        .and_then(|d| d.get("link"))
        .and_then(|l| l.as_str())
        .map(|l| l.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_link() {
        let response = json!({ "data": { "link": "https://i.imgur.com/abc123.png" } });
        assert_eq!(
            extract_link(&response).unwrap(),
            "https://i.imgur.com/abc123.png"
        );
    }

    #[test]
    fn test_extract_link_missing() {
        assert_eq!(extract_link(&json!({})), None);
        assert_eq!(extract_link(&json!({ "data": {} })), None);
    }
}
