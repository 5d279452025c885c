use data_encoding::BASE64;
use serde::{Deserialize, Serialize};

/// Request to email a submitter the PDF of their candidature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailRequest {
    pub email: String,
    pub name: String,
    /// Base64 PDF, optionally as a `data:` URI.
    pub pdf: String,
}

impl SendEmailRequest {
    /// Decode the attached PDF.
    pub fn pdf_bytes(&self) -> Result<Vec<u8>, data_encoding::DecodeError> {
        let encoded = match self.pdf.split_once(";base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => self.pdf.as_str(),
        };
        let encoded: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        BASE64.decode(encoded.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(pdf: &str) -> SendEmailRequest {
        SendEmailRequest {
            email: "agnes@example.com".to_string(),
            name: "Agnes".to_string(),
            pdf: pdf.to_string(),
        }
    }

    #[test]
    fn plain_base64_is_decoded() {
        assert_eq!(request("JVBERi0x").pdf_bytes().unwrap(), b"%PDF-1");
    }

    #[test]
    fn data_uri_prefix_is_stripped() {
        let pdf = request("data:application/pdf;filename=generated.pdf;base64,JVBERi0x");
        assert_eq!(pdf.pdf_bytes().unwrap(), b"%PDF-1");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(request("not base64!").pdf_bytes().is_err());
    }
}
