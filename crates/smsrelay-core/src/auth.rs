use crate::domain::UserId;

/// Allow-list gate for operator commands.
///
/// An empty allow-list means nobody is authorized; commands never fall open.
pub fn is_authorized(user_id: Option<UserId>, operators: &[i64]) -> bool {
    let Some(user_id) = user_id else {
        return false;
    };
    if operators.is_empty() {
        return false;
    }
    operators.contains(&user_id.0)
}
