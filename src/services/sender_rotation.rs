//! services/sender_rotation.rs
//! Rotación de remitentes: cada `emails_per_sender` envíos exitosos se pasa al
//! siguiente remitente, dando la vuelta al llegar a `max_sender_sequence`.

use crate::models::settings_model::{
    SenderRotationSettings, DEFAULT_EMAILS_PER_SENDER, DEFAULT_MAX_SENDER_SEQUENCE,
};

/// Índice de remitente (1-based) para el próximo envío.
/// `sent_count` son los envíos *exitosos* hasta ahora. Parámetros <= 0 se
/// reemplazan por los defaults (50, 3); el resultado siempre está en
/// `[1, max_sender_sequence]`.
pub fn sender_index(sent_count: i64, emails_per_sender: i64, max_sender_sequence: i64) -> i64 {
    let per_sender = if emails_per_sender > 0 {
        emails_per_sender
    } else {
        DEFAULT_EMAILS_PER_SENDER
    };
    let max_sequence = if max_sender_sequence > 0 {
        max_sender_sequence
    } else {
        DEFAULT_MAX_SENDER_SEQUENCE
    };

    (sent_count.max(0) / per_sender) % max_sequence + 1
}

/// Igual que `sender_index`, tomando los parámetros de los settings.
pub fn sender_index_for(sent_count: i64, settings: &SenderRotationSettings) -> i64 {
    sender_index(
        sent_count,
        settings.emails_per_sender,
        settings.max_sender_sequence,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_per_sender_three_senders() {
        let seq: Vec<i64> = (0..10).map(|n| sender_index(n, 2, 3)).collect();
        assert_eq!(seq, vec![1, 1, 2, 2, 3, 3, 1, 1, 2, 2]);
    }

    #[test]
    fn test_defaults_rotate_every_fifty() {
        let settings = SenderRotationSettings::default();
        assert_eq!(sender_index_for(0, &settings), 1);
        assert_eq!(sender_index_for(49, &settings), 1);
        assert_eq!(sender_index_for(50, &settings), 2);
        assert_eq!(sender_index_for(149, &settings), 3);
        assert_eq!(sender_index_for(150, &settings), 1);
    }

    #[test]
    fn test_non_positive_parameters_fall_back_to_defaults() {
        assert_eq!(sender_index(60, 0, 3), 2);
        assert_eq!(sender_index(60, -5, 3), 2);
        assert_eq!(sender_index(160, 50, 0), 1);
    }

    #[test]
    fn test_result_always_in_range() {
        for max in 1..6 {
            for per in 1..4 {
                for sent in 0..40 {
                    let idx = sender_index(sent, per, max);
                    assert!((1..=max).contains(&idx), "idx={} fuera de [1,{}]", idx, max);
                }
            }
        }
    }
}
