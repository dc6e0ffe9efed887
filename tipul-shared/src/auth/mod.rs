/// Authentication and authorization for Tipul
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and the registration password policy
/// - [`jwt`]: access/refresh token issuing and validation
/// - [`middleware`]: bearer-token axum middleware and [`middleware::AuthContext`]
/// - [`authorization`]: ownership checks
///
/// # Example
///
/// ```
/// use tipul_shared::auth::password::{hash_password, verify_password};
/// use tipul_shared::auth::jwt::{create_token, validate_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("therapy2025")?;
/// assert!(verify_password("therapy2025", &hash)?);
///
/// let secret = "a-secret-that-is-at-least-32-bytes-long";
/// let token = create_token(&Claims::new(Uuid::new_v4(), TokenType::Access), secret)?;
/// validate_token(&token, secret)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
