use atrium_errors::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RbacError {
    #[error("Menu not found")]
    MenuNotFound,
    #[error("Parent menu not found")]
    ParentMenuNotFound,
    #[error("Menu code already exists under the same parent")]
    MenuCodeExists,
    #[error("Menu already exists")]
    MenuAlreadyExists,
    #[error("A menu cannot be moved under itself or its descendants")]
    MenuCycle,
    #[error("Menu deletion is disabled")]
    MenuDeletionDenied,
    #[error("Role not found")]
    RoleNotFound,
    #[error("Role code already exists")]
    RoleCodeExists,
    #[error("Permission not found")]
    PermissionNotFound,
    #[error("Permission slug already exists")]
    PermissionSlugExists,
    #[error("User not found")]
    UserNotFound,
    #[error("Username already exists")]
    UsernameExists,
    #[error("Invalid menu file: {0}")]
    InvalidMenuFile(String),
    #[error("{0}")]
    Invalid(String),
}

impl From<RbacError> for AppError {
    fn from(error: RbacError) -> Self {
        let message = error.to_string();
        match error {
            RbacError::MenuNotFound
            | RbacError::ParentMenuNotFound
            | RbacError::RoleNotFound
            | RbacError::PermissionNotFound
            | RbacError::UserNotFound => AppError::NotFound(message),
            RbacError::MenuCodeExists
            | RbacError::MenuAlreadyExists
            | RbacError::RoleCodeExists
            | RbacError::PermissionSlugExists
            | RbacError::UsernameExists => AppError::Conflict(message),
            RbacError::MenuDeletionDenied => AppError::PolicyViolation(message),
            RbacError::MenuCycle | RbacError::InvalidMenuFile(_) | RbacError::Invalid(_) => {
                AppError::Validation(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy() {
        assert!(matches!(AppError::from(RbacError::ParentMenuNotFound), AppError::NotFound(_)));
        assert!(matches!(AppError::from(RbacError::MenuCodeExists), AppError::Conflict(_)));
        assert!(matches!(
            AppError::from(RbacError::MenuDeletionDenied),
            AppError::PolicyViolation(_)
        ));
        assert!(matches!(AppError::from(RbacError::MenuCycle), AppError::Validation(_)));
    }
}
