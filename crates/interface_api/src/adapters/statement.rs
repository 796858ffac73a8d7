//! PDF closing statements

use std::path::Path;

use async_trait::async_trait;
use genpdf::{elements, fonts, style, Alignment, Element};
use tracing::debug;

use core_kernel::{DomainPort, PortError};
use domain_accounting::ClosingStatement;
use domain_lifecycle::{DocumentGenerator, GeneratedDocument};

const FONT_FAMILY: &str = "Roboto";

/// Renders closing statements with genpdf
///
/// Fonts are loaded once; rendering runs on the blocking pool.
#[derive(Clone)]
pub struct GenpdfStatementGenerator {
    fonts: fonts::FontFamily<fonts::FontData>,
}

impl GenpdfStatementGenerator {
    /// Loads the `Roboto` family from `fonts_dir`
    pub fn from_dir(fonts_dir: impl AsRef<Path>) -> Result<Self, PortError> {
        let dir = fonts_dir.as_ref();
        let fonts = fonts::from_files(dir, FONT_FAMILY, None).map_err(|e| {
            PortError::internal(format!("font family {} not found in {}: {}", FONT_FAMILY, dir.display(), e))
        })?;
        Ok(Self { fonts })
    }

    fn render(&self, statement: &ClosingStatement, company_name: &str, responsible_name: &str) -> Result<Vec<u8>, genpdf::error::Error> {
        let block = &statement.block;
        let mut doc = genpdf::Document::new(self.fonts.clone());
        doc.set_title(format!("Fechamento {}", block.code));
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        doc.push(elements::Paragraph::new(company_name).styled(style::Style::new().bold().with_font_size(18)));
        doc.push(elements::Break::new(1));
        doc.push(
            elements::Paragraph::new(format!("FECHAMENTO DO BLOCO {}", block.code))
                .styled(style::Style::new().bold().with_font_size(14)),
        );
        doc.push(elements::Paragraph::new(format!("Responsável: {}", responsible_name)));
        if let Some(request) = &statement.request {
            doc.push(elements::Paragraph::new(format!(
                "Solicitação: {} ({})",
                request.id,
                request.request_type.as_str()
            )));
        }
        doc.push(elements::Paragraph::new(format!("Aberto em: {}", block.created_at.format("%d/%m/%Y"))));
        doc.push(elements::Paragraph::new(format!("Valor inicial: {}", block.initial_amount)));
        doc.push(elements::Break::new(1.5));

        let mut table = elements::TableLayout::new(vec![2, 2, 3, 2, 2]);
        table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
        let bold = style::Style::new().bold();
        table
            .row()
            .element(elements::Paragraph::new("Data").styled(bold))
            .element(elements::Paragraph::new("Tipo").styled(bold))
            .element(elements::Paragraph::new("Categoria").styled(bold))
            .element(elements::Paragraph::new("Pagamento").styled(bold))
            .element(elements::Paragraph::new("Valor").styled(bold))
            .push()?;
        for expense in &statement.expenses {
            table
                .row()
                .element(elements::Paragraph::new(expense.date.format("%d/%m/%Y").to_string()))
                .element(elements::Paragraph::new(expense.kind.label()))
                .element(elements::Paragraph::new(expense.category.as_str()))
                .element(elements::Paragraph::new(expense.payment_method.label()))
                .element(elements::Paragraph::new(expense.signed_effect().to_string()).aligned(Alignment::Right))
                .push()?;
        }
        doc.push(table);
        doc.push(elements::Break::new(1.5));

        let summary = &statement.summary;
        for (label, value) in [
            ("Entradas", summary.credits),
            ("Saídas", summary.debits),
            ("Reembolsos", summary.reimbursements),
        ] {
            doc.push(elements::Paragraph::new(format!("{}: {}", label, value)).aligned(Alignment::Right));
        }
        doc.push(
            elements::Paragraph::new(format!("SALDO FINAL: {}", statement.saldo_final()))
                .aligned(Alignment::Right)
                .styled(style::Style::new().bold().with_font_size(12)),
        );

        let mut buffer = Vec::new();
        doc.render(&mut buffer)?;
        Ok(buffer)
    }
}

impl DomainPort for GenpdfStatementGenerator {}

#[async_trait]
impl DocumentGenerator for GenpdfStatementGenerator {
    async fn generate(
        &self,
        statement: &ClosingStatement,
        company_name: &str,
        responsible_name: &str,
    ) -> Result<GeneratedDocument, PortError> {
        let generator = self.clone();
        let statement = statement.clone();
        let company_name = company_name.to_string();
        let responsible_name = responsible_name.to_string();

        let bytes = tokio::task::spawn_blocking(move || generator.render(&statement, &company_name, &responsible_name))
            .await
            .map_err(|e| PortError::internal(format!("statement renderer stopped: {}", e)))?
            .map_err(|e| PortError::internal(format!("statement rendering failed: {}", e)))?;

        debug!(size = bytes.len(), "Closing statement rendered");
        Ok(GeneratedDocument {
            bytes,
            content_type: "application/pdf".to_string(),
        })
    }
}
