use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    forms::{
        CardForm, GenerateAccountsForm, GenerateTransactionsForm, LoanForm, TransactionForm,
        TransferForm,
    },
    load_settings, AccountBrowser, AccountsGateway, AsyncOperationSlot, DetailOutcome,
    HttpAccountsGateway, LoadOutcome, OperationForm, OperationsConsole, SelectOutcome,
    SlotState, Submission,
};
use rust_decimal::Decimal;
use shared::domain::{Account, AccountId, CardType, LoanType, TransactionKind, TransferType};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Operator console for the banking API")]
struct Args {
    /// Overrides `api_base_url` from dashboard.toml / environment.
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe the API health endpoint.
    Health,
    /// List accounts and show the auto-selected one.
    Accounts,
    /// Show one account with its transaction history.
    Show { account_id: String },
    /// Post a transaction on an account.
    Post {
        account_id: String,
        #[arg(long, value_enum, default_value_t = Kind::Credit)]
        kind: Kind,
        #[arg(long)]
        amount: Decimal,
        #[arg(long, default_value = "")]
        label: String,
    },
    GenerateAccounts {
        #[arg(long, default_value_t = 1)]
        count: u32,
        #[arg(long)]
        user_id: Option<u64>,
    },
    GenerateTransactions {
        #[arg(long)]
        account_id: u64,
        #[arg(long, default_value_t = 10)]
        count: u32,
    },
    Transfer {
        #[arg(long)]
        from: u64,
        #[arg(long)]
        to: u64,
        #[arg(long)]
        amount: Decimal,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_enum, default_value_t = Transfer::Sepa)]
        transfer_type: Transfer,
    },
    Card {
        #[arg(long)]
        account_id: u64,
        #[arg(long, value_enum, default_value_t = Card::Debit)]
        card_type: Card,
        #[arg(long)]
        limit: Option<Decimal>,
    },
    Loan {
        #[arg(long)]
        account_id: u64,
        #[arg(long, value_enum, default_value_t = Loan::Personal)]
        loan_type: Loan,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        interest_rate: Decimal,
        #[arg(long)]
        duration_months: u32,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Credit,
    Debit,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Transfer {
    Sepa,
    International,
    Instant,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Card {
    Debit,
    Credit,
    Virtual,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Loan {
    Personal,
    Mortgage,
    Auto,
}

impl From<Kind> for TransactionKind {
    fn from(value: Kind) -> Self {
        match value {
            Kind::Credit => Self::Credit,
            Kind::Debit => Self::Debit,
        }
    }
}

impl From<Transfer> for TransferType {
    fn from(value: Transfer) -> Self {
        match value {
            Transfer::Sepa => Self::Sepa,
            Transfer::International => Self::International,
            Transfer::Instant => Self::Instant,
        }
    }
}

impl From<Card> for CardType {
    fn from(value: Card) -> Self {
        match value {
            Card::Debit => Self::Debit,
            Card::Credit => Self::Credit,
            Card::Virtual => Self::Virtual,
        }
    }
}

impl From<Loan> for LoanType {
    fn from(value: Loan) -> Self {
        match value {
            Loan::Personal => Self::Personal,
            Loan::Mortgage => Self::Mortgage,
            Loan::Auto => Self::Auto,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(url) = args.api_url {
        settings.api_base_url = url;
    }
    if let Some(key) = args.api_key {
        settings.api_key = key;
    }
    settings.validate().context("invalid dashboard settings")?;
    let gateway: Arc<dyn AccountsGateway> =
        Arc::new(HttpAccountsGateway::new(&settings).context("failed to build api client")?);
    info!(api = %settings.api_base_url, "dashboard starting");

    match args.command {
        Command::Health => {
            let browser = AccountBrowser::new(gateway);
            browser.load_health().await;
            match browser.health() {
                Some(health) => match health.timestamp {
                    Some(at) => println!("{} {} ({at})", health.service, health.status),
                    None => println!("{} {}", health.service, health.status),
                },
                None => bail!("api health probe failed"),
            }
        }
        Command::Accounts => {
            let browser = AccountBrowser::new(gateway);
            match browser.refresh_all().await {
                LoadOutcome::Failed(message) => bail!(message),
                outcome => info!(?outcome, "accounts refreshed"),
            }
            for account in browser.accounts() {
                print_summary(&account, browser.selected_id().as_ref());
            }
            if let Some(selected) = browser.selected() {
                println!();
                print_detail(&selected);
            }
        }
        Command::Show { account_id } => {
            let browser = AccountBrowser::new(gateway);
            select(&browser, account_id).await?;
        }
        Command::Post {
            account_id,
            kind,
            amount,
            label,
        } => {
            let browser = AccountBrowser::new(gateway);
            select(&browser, account_id).await?;
            browser.transaction_slot().set_form(TransactionForm {
                kind: kind.into(),
                amount: Some(amount),
                label,
            });
            let outcome = browser.submit_transaction().await;
            report(browser.transaction_slot(), &outcome)?;
            if let Some(selected) = browser.selected() {
                print_detail(&selected);
            }
        }
        Command::GenerateAccounts { count, user_id } => {
            let console = OperationsConsole::new(gateway);
            console
                .generate_accounts_slot()
                .set_form(GenerateAccountsForm { count, user_id });
            let outcome = console.generate_accounts().await;
            report(console.generate_accounts_slot(), &outcome)?;
            if let Submission::Succeeded(response) = outcome {
                println!("{}", serde_json::to_string_pretty(&response.data)?);
            }
        }
        Command::GenerateTransactions { account_id, count } => {
            let console = OperationsConsole::new(gateway);
            console
                .generate_transactions_slot()
                .set_form(GenerateTransactionsForm {
                    count,
                    account_id: Some(account_id),
                });
            let outcome = console.generate_transactions().await;
            report(console.generate_transactions_slot(), &outcome)?;
        }
        Command::Transfer {
            from,
            to,
            amount,
            description,
            transfer_type,
        } => {
            let console = OperationsConsole::new(gateway);
            console.transfer_slot().set_form(TransferForm {
                from_account_id: Some(from),
                to_account_id: Some(to),
                amount: Some(amount),
                description,
                transfer_type: transfer_type.into(),
            });
            let outcome = console.transfer_funds().await;
            report(console.transfer_slot(), &outcome)?;
        }
        Command::Card {
            account_id,
            card_type,
            limit,
        } => {
            let console = OperationsConsole::new(gateway);
            console.card_slot().set_form(CardForm {
                account_id: Some(account_id),
                card_type: card_type.into(),
                limit,
            });
            let outcome = console.create_card().await;
            report(console.card_slot(), &outcome)?;
        }
        Command::Loan {
            account_id,
            loan_type,
            amount,
            interest_rate,
            duration_months,
        } => {
            let console = OperationsConsole::new(gateway);
            console.loan_slot().set_form(LoanForm {
                account_id: Some(account_id),
                loan_type: loan_type.into(),
                amount: Some(amount),
                interest_rate: Some(interest_rate),
                duration_months: Some(duration_months),
            });
            let outcome = console.create_loan().await;
            report(console.loan_slot(), &outcome)?;
        }
    }

    Ok(())
}

async fn select(browser: &AccountBrowser, account_id: String) -> Result<()> {
    match browser.select_account(AccountId::from(account_id)).await {
        SelectOutcome::Fetched(DetailOutcome::Applied) => {}
        SelectOutcome::Fetched(DetailOutcome::Failed(message)) => bail!(message),
        other => bail!("account selection did not complete: {other:?}"),
    }
    if let Some(selected) = browser.selected() {
        print_detail(&selected);
    }
    Ok(())
}

/// Prints slot feedback; failures and rejections become the process error.
fn report<F: OperationForm, T>(slot: &AsyncOperationSlot<F>, outcome: &Submission<T>) -> Result<()> {
    match outcome {
        Submission::Rejected(rejection) => {
            let errors = slot.visible_errors();
            if errors.is_empty() {
                bail!("{} rejected: {rejection:?}", slot.name());
            }
            bail!("{} rejected: {errors}", slot.name());
        }
        Submission::Cancelled => bail!("{} cancelled", slot.name()),
        Submission::Succeeded(_) | Submission::Failed(_) => {}
    }
    match slot.state() {
        SlotState::Succeeded(message) => {
            println!("{message}");
            Ok(())
        }
        SlotState::Failed(message) => bail!(message),
        SlotState::Idle | SlotState::Pending => Ok(()),
    }
}

fn print_summary(account: &Account, selected: Option<&AccountId>) {
    let marker = if Some(&account.id) == selected { '*' } else { ' ' };
    println!(
        "{marker} {:<12} {:<24} {:>12} {}",
        account.id, account.holder, account.balance, account.currency
    );
}

fn print_detail(account: &Account) {
    println!("{} {}", account.id, account.holder);
    println!("  balance: {} {}", account.balance, account.currency);
    if let Some(iban) = &account.iban {
        println!("  iban:    {iban}");
    }
    if let Some(updated) = account.last_updated {
        println!("  updated: {updated}");
    }
    for transaction in &account.transactions {
        let sign = match transaction.kind {
            TransactionKind::Credit => '+',
            TransactionKind::Debit => '-',
        };
        println!(
            "  {sign}{:>10} {} {}",
            transaction.amount,
            transaction
                .timestamp
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default(),
            transaction.label.as_deref().unwrap_or("")
        );
    }
}
