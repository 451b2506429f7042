use crate::models::{ParsedTransaction, Summary, TxnKind};

/// Pure fold over the final transaction list. Zero transactions is a valid,
/// all-zero summary.
pub fn summarize(transactions: &[ParsedTransaction]) -> Summary {
    let mut summary = Summary {
        count: transactions.len(),
        ..Summary::default()
    };
    for txn in transactions {
        match txn.kind {
            TxnKind::Income => summary.income += txn.amount,
            TxnKind::Expense => summary.expense += txn.amount,
        }
    }
    summary.balance = summary.income - summary.expense;
    summary
}
