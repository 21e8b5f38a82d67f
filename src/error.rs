// DANS : src/error.rs

use thiserror::Error;

/// Erreur fatale au démarrage : la boucle n'est jamais construite.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("variable d'environnement manquante ou vide : {0}")]
    Missing(String),
    #[error("valeur invalide pour {field} : {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("lecture de l'environnement impossible : {0}")]
    Env(#[from] envy::Error),
}

/// Échec d'un appel à la source de signatures (ou d'un fetch RPC en général).
/// Toujours récupérable : on dort et on réessaie au cycle suivant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("erreur réseau : {0}")]
    Transport(String),
    #[error("limite de requêtes atteinte chez le fournisseur RPC : {0}")]
    RateLimited(String),
    #[error("réponse RPC invalide : {0}")]
    Upstream(String),
}

impl SourceError {
    /// Vrai si un nouvel essai immédiat a une chance de réussir.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Transport(_) | SourceError::RateLimited(_))
    }
}

/// Échec du décodage d'une signature. Ne concerne que cette signature.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("transaction introuvable (corps null)")]
    MissingBody,
    #[error("transaction illisible : {0}")]
    Malformed(String),
    #[error("instruction d'initialisation tronquée : {0}")]
    Truncated(String),
    #[error("récupération de la transaction échouée : {0}")]
    Fetch(#[from] SourceError),
}

impl DecodeError {
    /// Seuls les échecs de récupération méritent qu'on revoie la signature plus tard :
    /// une transaction mal formée le restera.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DecodeError::Fetch(_))
    }
}

/// Échec de la livraison d'une notification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("identifiants de messagerie refusés : {0}")]
    Unauthorized(String),
    #[error("destinataire injoignable : {0}")]
    RecipientUnreachable(String),
    #[error("erreur temporaire de livraison : {0}")]
    Transient(String),
}

impl DeliveryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DeliveryError::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_fetch_failures_are_retryable_decode_errors() {
        assert!(DecodeError::Fetch(SourceError::Transport("timeout".into())).is_retryable());
        assert!(!DecodeError::MissingBody.is_retryable());
        assert!(!DecodeError::Truncated("3 comptes".into()).is_retryable());
    }

    #[test]
    fn upstream_errors_are_not_retried_in_place() {
        assert!(SourceError::RateLimited("429".into()).is_retryable());
        assert!(!SourceError::Upstream("-32602".into()).is_retryable());
    }
}
