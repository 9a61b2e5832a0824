use crate::{
    error::{Result, StagingError},
    models::GenerationRequest,
};
use actix_multipart::{Field, Multipart};
use futures::TryStreamExt;

const MAX_TEXT_FIELD_BYTES: usize = 8 * 1024;

/// Raw fields of the generate form before validation.
#[derive(Debug, Default)]
pub struct GenerateForm {
    pub image: Option<Vec<u8>>,
    pub content_type: Option<String>,
    pub style: Option<String>,
    pub room_type: Option<String>,
    pub custom_prompt: Option<String>,
}

impl GenerateForm {
    pub async fn read(mut payload: Multipart, max_upload_bytes: usize) -> Result<Self> {
        let mut form = GenerateForm::default();

        while let Some(mut field) = payload
            .try_next()
            .await
            .map_err(|e| StagingError::Validation(format!("Malformed multipart body: {}", e)))?
        {
            let name = field
                .content_disposition()
                .get_name()
                .unwrap_or_default()
                .to_string();
            match name.as_str() {
                "image" => {
                    form.content_type = field
                        .content_type()
                        .map(|mime| mime.essence_str().to_string());
                    let bytes = read_field(&mut field, max_upload_bytes, "image").await?;
                    form.image = Some(bytes).filter(|bytes| !bytes.is_empty());
                }
                "style" => form.style = read_text(&mut field, "style").await?,
                "roomType" => form.room_type = read_text(&mut field, "roomType").await?,
                "customPrompt" => form.custom_prompt = read_text(&mut field, "customPrompt").await?,
                _ => {
                    while field
                        .try_next()
                        .await
                        .map_err(|e| StagingError::Validation(e.to_string()))?
                        .is_some()
                    {}
                }
            }
        }

        Ok(form)
    }

    /// Reject the form unless every required field is present.
    pub fn into_request(self) -> Result<GenerationRequest> {
        let mut missing = Vec::new();
        if self.image.is_none() {
            missing.push("image");
        }
        if self.style.is_none() {
            missing.push("style");
        }
        if self.room_type.is_none() {
            missing.push("roomType");
        }
        if !missing.is_empty() {
            return Err(StagingError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(GenerationRequest {
            image_bytes: self.image.unwrap_or_default(),
            content_type: self.content_type,
            style_id: self.style.unwrap_or_default(),
            room_type_id: self.room_type.unwrap_or_default(),
            custom_prompt: self.custom_prompt,
        })
    }
}

async fn read_field(field: &mut Field, limit: usize, name: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| StagingError::Validation(format!("Cannot read field '{}': {}", name, e)))?
    {
        if bytes.len() + chunk.len() > limit {
            return Err(StagingError::Validation(format!(
                "Field '{}' exceeds the {} byte limit",
                name, limit
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Blank text fields count as absent.
async fn read_text(field: &mut Field, name: &str) -> Result<Option<String>> {
    let bytes = read_field(field, MAX_TEXT_FIELD_BYTES, name).await?;
    let text = String::from_utf8(bytes)
        .map_err(|_| StagingError::Validation(format!("Field '{}' is not valid UTF-8", name)))?;
    let text = text.trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_are_all_named() {
        let form = GenerateForm {
            image: Some(vec![1, 2, 3]),
            style: Some("modern".into()),
            ..Default::default()
        };
        let err = form.into_request().unwrap_err();
        assert!(matches!(err, StagingError::Validation(_)));
        assert!(err.to_string().contains("Missing required fields: roomType"));

        let err = GenerateForm::default().into_request().unwrap_err();
        assert!(err.to_string().contains("image, style, roomType"));
    }

    #[test]
    fn test_complete_form_becomes_request() {
        let form = GenerateForm {
            image: Some(vec![0xff, 0xd8]),
            content_type: Some("image/jpeg".into()),
            style: Some("boho".into()),
            room_type: Some("dining".into()),
            custom_prompt: None,
        };
        let request = form.into_request().unwrap();
        assert_eq!(request.style_id, "boho");
        assert_eq!(request.room_type_id, "dining");
        assert_eq!(request.image_bytes, vec![0xff, 0xd8]);
    }
}
