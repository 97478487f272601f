// src/models/screens.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::common::error::AppError;
use crate::models::impl_text_scalar;

/// Catálogo fechado de telas do sistema. Adicionar uma tela nova exige
/// atualizar este enum e a matriz de permissões padrão.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ScreenKey {
    Usuarios,
    Fornecedores,
    Clientes,
    Filiais,
    Rotas,
    Produtos,
    Grupos,
    Subgrupos,
    Classes,
    NomeGenericoProduto,
    Unidades,
    UnidadesEscolares,
    Marcas,
    Veiculos,
    Motoristas,
    Ajudantes,
    Cotacao,
    Permissoes,
    Auditoria,
}

impl ScreenKey {
    pub const ALL: [ScreenKey; 19] = [
        ScreenKey::Usuarios,
        ScreenKey::Fornecedores,
        ScreenKey::Clientes,
        ScreenKey::Filiais,
        ScreenKey::Rotas,
        ScreenKey::Produtos,
        ScreenKey::Grupos,
        ScreenKey::Subgrupos,
        ScreenKey::Classes,
        ScreenKey::NomeGenericoProduto,
        ScreenKey::Unidades,
        ScreenKey::UnidadesEscolares,
        ScreenKey::Marcas,
        ScreenKey::Veiculos,
        ScreenKey::Motoristas,
        ScreenKey::Ajudantes,
        ScreenKey::Cotacao,
        ScreenKey::Permissoes,
        ScreenKey::Auditoria,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenKey::Usuarios => "usuarios",
            ScreenKey::Fornecedores => "fornecedores",
            ScreenKey::Clientes => "clientes",
            ScreenKey::Filiais => "filiais",
            ScreenKey::Rotas => "rotas",
            ScreenKey::Produtos => "produtos",
            ScreenKey::Grupos => "grupos",
            ScreenKey::Subgrupos => "subgrupos",
            ScreenKey::Classes => "classes",
            ScreenKey::NomeGenericoProduto => "nome_generico_produto",
            ScreenKey::Unidades => "unidades",
            ScreenKey::UnidadesEscolares => "unidades_escolares",
            ScreenKey::Marcas => "marcas",
            ScreenKey::Veiculos => "veiculos",
            ScreenKey::Motoristas => "motoristas",
            ScreenKey::Ajudantes => "ajudantes",
            ScreenKey::Cotacao => "cotacao",
            ScreenKey::Permissoes => "permissoes",
            ScreenKey::Auditoria => "auditoria",
        }
    }

    /// Nome de exibição usado pelo frontend na tela de permissões.
    pub fn label(&self) -> &'static str {
        match self {
            ScreenKey::Usuarios => "Usuários",
            ScreenKey::Fornecedores => "Fornecedores",
            ScreenKey::Clientes => "Clientes",
            ScreenKey::Filiais => "Filiais",
            ScreenKey::Rotas => "Rotas",
            ScreenKey::Produtos => "Produtos",
            ScreenKey::Grupos => "Grupos",
            ScreenKey::Subgrupos => "Subgrupos",
            ScreenKey::Classes => "Classes",
            ScreenKey::NomeGenericoProduto => "Nome Genérico",
            ScreenKey::Unidades => "Unidades",
            ScreenKey::UnidadesEscolares => "Unidades Escolares",
            ScreenKey::Marcas => "Marcas",
            ScreenKey::Veiculos => "Veículos",
            ScreenKey::Motoristas => "Motoristas",
            ScreenKey::Ajudantes => "Ajudantes",
            ScreenKey::Cotacao => "Cotação",
            ScreenKey::Permissoes => "Permissões",
            ScreenKey::Auditoria => "Auditoria",
        }
    }
}

impl fmt::Display for ScreenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScreenKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| AppError::UnknownScreen(s.to_string()))
    }
}

impl_text_scalar!(ScreenKey);

/// Uma capacidade sobre uma tela.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Visualizar,
    Criar,
    Editar,
    Excluir,
    Mover,
}

impl Capability {
    /// Nome da coluna correspondente em `permissoes_usuario` (também é a
    /// chave composta `{tela}_{coluna}` usada no diff de auditoria).
    pub fn column(&self) -> &'static str {
        match self {
            Capability::Visualizar => "pode_visualizar",
            Capability::Criar => "pode_criar",
            Capability::Editar => "pode_editar",
            Capability::Excluir => "pode_excluir",
            Capability::Mover => "pode_mover",
        }
    }
}

/// Item de `GET /api/permissions/screens`, no formato que o frontend espera.
#[derive(Debug, Serialize, ToSchema)]
pub struct Tela {
    #[schema(example = 13)]
    pub id: u32,
    #[schema(example = "Marcas")]
    pub nome: &'static str,
    pub chave: ScreenKey,
}

pub fn listar_telas() -> Vec<Tela> {
    ScreenKey::ALL
        .iter()
        .enumerate()
        .map(|(i, k)| Tela {
            id: (i + 1) as u32,
            nome: k.label(),
            chave: *k,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_screen() {
        for screen in ScreenKey::ALL {
            assert_eq!(screen.as_str().parse::<ScreenKey>().unwrap(), screen);
        }
    }

    #[test]
    fn unknown_screen_is_rejected() {
        assert!("pedidos_compras".parse::<ScreenKey>().is_err());
    }

    #[test]
    fn catalog_listing_is_stable() {
        let telas = listar_telas();
        assert_eq!(telas.len(), ScreenKey::ALL.len());
        assert_eq!(telas[0].chave, ScreenKey::Usuarios);
        assert_eq!(telas[0].id, 1);
    }
}
