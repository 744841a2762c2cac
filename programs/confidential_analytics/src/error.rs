use anchor_lang::prelude::*;

#[error_code]
pub enum AnalyticsError {
    // Authorization
    #[msg("Caller is not the registry owner")]
    Unauthorized,
    #[msg("Caller is not an authorized data provider")]
    NotProvider,

    // Lifecycle
    #[msg("A batch is already open")]
    BatchAlreadyOpen,
    #[msg("No batch is currently active")]
    NoActiveBatch,
    #[msg("System is already paused")]
    AlreadyPaused,
    #[msg("System is not paused")]
    NotPaused,
    #[msg("System is paused")]
    SystemPaused,
    #[msg("Batch id does not follow the ledger sequence")]
    UnexpectedBatchId,

    // Rate limiting
    #[msg("Provider cooldown has not elapsed")]
    CooldownActive,

    // Protocol integrity
    #[msg("No decryption request matches this handle")]
    UnknownRequest,
    #[msg("Decryption request was already processed")]
    ReplayDetected,
    #[msg("Aggregate state does not match the request commitment")]
    StateMismatch,
    #[msg("Decryption proof failed verification")]
    InvalidProof,
    #[msg("Batch is in an invalid state for this request")]
    InvalidBatchState,
    #[msg("Cleartext payload has the wrong length")]
    MalformedCleartexts,

    // Internal
    #[msg("Failed to compute aggregate commitment")]
    CommitmentFailure,
    #[msg("Arithmetic overflow")]
    ArithmeticOverflow,
}
