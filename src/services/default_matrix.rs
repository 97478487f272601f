// src/services/default_matrix.rs

use std::collections::BTreeMap;

use crate::models::auth::{NivelAcesso, TipoAcesso};
use crate::models::permissions::CapabilitySet;
use crate::models::screens::ScreenKey;

/// Matriz estática de permissões padrão por (tipo, nível) sobre o catálogo
/// completo de telas. Alimenta o preview do frontend e o reseed quando o
/// tier de um usuário muda. Apenas `administrador` e `coordenador` têm
/// entradas; os demais tipos não têm padrão definido.
pub fn get_defaults(
    tipo: TipoAcesso,
    nivel: NivelAcesso,
) -> Option<BTreeMap<ScreenKey, CapabilitySet>> {
    if !matches!(tipo, TipoAcesso::Administrador | TipoAcesso::Coordenador) {
        return None;
    }
    Some(
        ScreenKey::ALL
            .iter()
            .map(|&screen| (screen, default_for(tipo, nivel, screen)))
            .collect(),
    )
}

fn default_for(tipo: TipoAcesso, nivel: NivelAcesso, screen: ScreenKey) -> CapabilitySet {
    use CapabilitySet as C;
    use NivelAcesso::*;
    use ScreenKey::*;

    match (nivel, screen) {
        // As telas de controle ficam fora dos padrões até o nível III.
        (I | II, Permissoes | Auditoria) => C::NONE,
        // Cotação nunca passa de leitura nos padrões, em qualquer tier.
        (_, Cotacao) => C::VIEW,

        (I, _) => C::VIEW,

        (II, Usuarios) => C::new(true, true, false, false),
        (II, _) => C::VCE,

        (III, Auditoria) => C::VIEW,
        (III, Usuarios | Permissoes) => {
            if tipo == TipoAcesso::Administrador {
                C::FULL
            } else {
                C::VCE
            }
        }
        (III, _) => C::FULL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entry_covers_the_full_catalog() {
        for tipo in [TipoAcesso::Administrador, TipoAcesso::Coordenador] {
            for nivel in [NivelAcesso::I, NivelAcesso::II, NivelAcesso::III] {
                let map = get_defaults(tipo, nivel).unwrap();
                assert_eq!(map.len(), ScreenKey::ALL.len());
            }
        }
    }

    #[test]
    fn tiers_without_entry_return_none() {
        assert!(get_defaults(TipoAcesso::Gerente, NivelAcesso::III).is_none());
        assert!(get_defaults(TipoAcesso::Supervisor, NivelAcesso::I).is_none());
    }

    #[test]
    fn nivel_i_is_view_only() {
        let map = get_defaults(TipoAcesso::Coordenador, NivelAcesso::I).unwrap();
        assert_eq!(map[&ScreenKey::Marcas], CapabilitySet::VIEW);
        assert_eq!(map[&ScreenKey::Permissoes], CapabilitySet::NONE);
        assert_eq!(map[&ScreenKey::Auditoria], CapabilitySet::NONE);
    }

    #[test]
    fn nivel_ii_restricts_usuarios_and_cotacao() {
        let map = get_defaults(TipoAcesso::Administrador, NivelAcesso::II).unwrap();
        assert_eq!(map[&ScreenKey::Usuarios], CapabilitySet::new(true, true, false, false));
        assert_eq!(map[&ScreenKey::Cotacao], CapabilitySet::VIEW);
        assert_eq!(map[&ScreenKey::Fornecedores], CapabilitySet::VCE);
    }

    #[test]
    fn nivel_iii_differs_between_admin_and_coordenador() {
        let admin = get_defaults(TipoAcesso::Administrador, NivelAcesso::III).unwrap();
        let coord = get_defaults(TipoAcesso::Coordenador, NivelAcesso::III).unwrap();
        assert_eq!(admin[&ScreenKey::Permissoes], CapabilitySet::FULL);
        assert_eq!(coord[&ScreenKey::Permissoes], CapabilitySet::VCE);
        assert_eq!(coord[&ScreenKey::Usuarios], CapabilitySet::VCE);
        assert_eq!(admin[&ScreenKey::Produtos], CapabilitySet::FULL);
        assert_eq!(coord[&ScreenKey::Cotacao], CapabilitySet::VIEW);
    }
}
