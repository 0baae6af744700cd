use std::path::Path;

/// Validation errors for document uploads
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}

/// Document upload validator
///
/// Provides validation for uploaded documents without coupling to storage
/// implementation details.
pub struct DocumentValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
}

impl DocumentValidator {
    pub fn new(
        max_file_size: usize,
        allowed_extensions: Vec<String>,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            max_file_size,
            allowed_extensions,
            allowed_content_types,
        }
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate file extension
    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(())
    }

    /// Validate content type
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type.to_lowercase();

        if !self
            .allowed_content_types
            .iter()
            .any(|ct| ct == &normalized)
        {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Run all validations
    pub fn validate_all(
        &self,
        filename: &str,
        content_type: &str,
        size: usize,
    ) -> Result<(), ValidationError> {
        self.validate_file_size(size)?;
        self.validate_extension(filename)?;
        self.validate_content_type(content_type)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_validator() -> DocumentValidator {
        DocumentValidator::new(
            10 * 1024 * 1024,
            vec!["pdf".to_string()],
            vec!["application/pdf".to_string()],
        )
    }

    #[test]
    fn test_accepts_valid_pdf() {
        let validator = pdf_validator();
        assert!(validator
            .validate_all("lecture.pdf", "application/pdf", 1024)
            .is_ok());
    }

    #[test]
    fn test_rejects_empty_file() {
        let validator = pdf_validator();
        assert!(matches!(
            validator.validate_file_size(0),
            Err(ValidationError::EmptyFile)
        ));
    }

    #[test]
    fn test_rejects_oversized_file() {
        let validator = pdf_validator();
        let result = validator.validate_file_size(11 * 1024 * 1024);
        assert!(matches!(result, Err(ValidationError::FileTooLarge { .. })));
    }

    #[test]
    fn test_rejects_wrong_extension() {
        let validator = pdf_validator();
        let result = validator.validate_extension("notes.docx");
        assert!(matches!(
            result,
            Err(ValidationError::InvalidExtension { .. })
        ));
    }

    #[test]
    fn test_extension_case_insensitive() {
        let validator = pdf_validator();
        assert!(validator.validate_extension("REPORT.PDF").is_ok());
    }

    #[test]
    fn test_rejects_missing_extension() {
        let validator = pdf_validator();
        assert!(matches!(
            validator.validate_extension("no_extension"),
            Err(ValidationError::InvalidFilename(_))
        ));
    }

    #[test]
    fn test_rejects_wrong_content_type() {
        let validator = pdf_validator();
        let result = validator.validate_content_type("image/png");
        assert!(matches!(
            result,
            Err(ValidationError::InvalidContentType { .. })
        ));
    }

    #[test]
    fn test_content_type_case_insensitive() {
        let validator = pdf_validator();
        assert!(validator.validate_content_type("Application/PDF").is_ok());
    }
}
