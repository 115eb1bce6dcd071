//! Annotator for transactions that arrive already annotated (e.g. submitted
//! over the node API by an indexer that resolved control programs itself).

use crate::domain::{AnnotatedInput, AnnotatedOutput, AnnotatedTransaction, AnnotationError};
use crate::ports::TransactionAnnotator;
use serde::{Deserialize, Serialize};

/// Wire form of an annotated transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreAnnotatedTransaction {
    pub tx_id: String,
    #[serde(default)]
    pub inputs: Vec<AnnotatedInput>,
    #[serde(default)]
    pub outputs: Vec<AnnotatedOutput>,
}

/// Validates a [`PreAnnotatedTransaction`] and passes it through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughAnnotator;

impl TransactionAnnotator for PassthroughAnnotator {
    type Transaction = PreAnnotatedTransaction;

    fn transaction_id(&self, tx: &PreAnnotatedTransaction) -> Result<String, AnnotationError> {
        let id = tx.tx_id.trim();
        if id.is_empty() {
            return Err(AnnotationError::MissingTransactionId);
        }
        Ok(id.to_string())
    }

    fn annotate(
        &self,
        tx: &PreAnnotatedTransaction,
    ) -> Result<AnnotatedTransaction, AnnotationError> {
        let tx_id = self.transaction_id(tx)?;

        if let Some(i) = tx.inputs.iter().position(|input| input.address.is_empty()) {
            return Err(AnnotationError::Malformed(format!(
                "input {} has no address",
                i
            )));
        }
        if let Some(i) = tx.outputs.iter().position(|output| output.address.is_empty()) {
            return Err(AnnotationError::Malformed(format!(
                "output {} has no address",
                i
            )));
        }

        Ok(AnnotatedTransaction {
            tx_id,
            inputs: tx.inputs.clone(),
            outputs: tx.outputs.clone(),
        })
    }
}
