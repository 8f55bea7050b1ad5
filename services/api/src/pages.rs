//! HTML pages of the upload form.

use edificio_core::pipeline::BatchReport;
use quick_xml::escape::escape;

const STYLESHEET: &str = "https://cdn.jsdelivr.net/npm/bootstrap@5.1.3/dist/css/bootstrap.min.css";

/// Columns listed on the upload form.
const EXPECTED_COLUMNS: &[&str] = &[
    "COMPLEMENTO, COMPLEMENTO2, RESULTADO",
    "LATITUDE, LONGITUDE, COD_ZONA",
    "LOCALIDADE, LOGRADOURO, BAIRRO",
    "MUNICIPIO, UF, COD_LOGRADOURO",
    "ID_ENDERECO, ID_ROTEIRO, ID_LOCALIDADE",
    "CEP, NUM_FACHADA, COD_SURVEY",
    "QUANTIDADE_UMS, ESTACAO_ABASTECEDORA",
];

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<link href="{STYLESHEET}" rel="stylesheet">
</head>
<body>
<div class="container mt-5" style="max-width: 800px">
{body}
</div>
</body>
</html>
"#
    )
}

/// Upload form, with an optional flash message above the column list.
pub fn index_page(message: Option<&str>) -> String {
    let alert = message
        .map(|m| format!(r#"<div class="alert alert-info mt-4" role="alert">{}</div>"#, escape(m)))
        .unwrap_or_default();
    let columns: String = EXPECTED_COLUMNS
        .iter()
        .map(|c| format!("<li>{c}</li>"))
        .collect();

    layout(
        "Gerador de XML para Edificações",
        &format!(
            r#"<h1 class="text-center mb-4">Gerador de XML para Edificações</h1>
<p class="lead text-center">Envie um arquivo CSV para gerar os arquivos XML</p>
<form method="POST" enctype="multipart/form-data" class="border rounded-3 p-4 text-center">
<label for="file" class="form-label">Arquivo CSV:</label>
<input class="form-control mb-3" type="file" name="file" id="file" accept=".csv" required>
<button type="submit" class="btn btn-primary btn-lg">Processar Arquivo</button>
</form>
{alert}
<div class="card mt-5">
<div class="card-header"><h5>Colunas esperadas</h5></div>
<div class="card-body">
<ul>{columns}</ul>
<p><strong>Separador:</strong> ponto e vírgula (;)</p>
</div>
</div>
<footer class="text-center mt-5"><a href="/sobre">Sobre este sistema</a></footer>"#
        ),
    )
}

/// Success page: record count, download link and the processing log.
pub fn result_page(report: &BatchReport) -> String {
    layout(
        "Processamento Concluído",
        &format!(
            r#"<h1 class="text-success text-center">Processamento Concluído</h1>
<p class="lead text-center">Processamento concluído! {count} registros processados.</p>
<div class="text-center mt-4">
<a href="/download/{name}" class="btn btn-primary btn-lg">Download do ZIP</a>
<a href="/" class="btn btn-secondary btn-lg ms-2">Processar Outro Arquivo</a>
</div>
<div class="card mt-5">
<div class="card-header"><h5>Log de Processamento</h5></div>
<div class="card-body"><pre style="max-height: 400px; overflow-y: auto">{log}</pre></div>
</div>"#,
            count = report.row_count,
            name = escape(&report.archive_name),
            log = escape(&report.log),
        ),
    )
}

pub fn about_page() -> String {
    layout(
        "Sobre o Sistema",
        r#"<h1>Sobre o Sistema</h1>
<div class="card mt-4">
<div class="card-header"><h5>Funcionalidades</h5></div>
<div class="card-body"><ul>
<li>Geração de um XML <code>edificio</code> por linha do CSV</li>
<li>Conversão de coordenadas com vírgula decimal</li>
<li>Mapeamento dos códigos de complemento</li>
<li>Arquivo ZIP com uma pasta numerada por registro</li>
</ul></div>
</div>
<div class="card mt-4">
<div class="card-header"><h5>Como usar</h5></div>
<div class="card-body"><ol>
<li>Envie um arquivo CSV separado por ponto e vírgula</li>
<li>Aguarde o processamento</li>
<li>Baixe o ZIP gerado (disponível por uma hora)</li>
</ol></div>
</div>
<div class="text-center mt-4"><a href="/" class="btn btn-primary">Voltar ao Início</a></div>"#,
    )
}
