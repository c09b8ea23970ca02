// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque entité correspond à une table gérée avec SeaORM.
//
// Liste des modules:
//   - health : Health check API
//   - users : Utilisateurs et solde virtuel
//   - market : Symboles tradables et prix courant simulé
//   - holding : Positions ouvertes (quantité + prix de revient moyen)
//   - alert : Alertes de prix (above / below, déclenchement unique)
//   - transaction_log : Journal immuable des trades exécutés
//   - dto : Data Transfer Objects pour les requêtes / réponses API
//
// Points d'attention:
//   - Tous les montants sont des Money (Decimal stocké en texte, jamais de f64)
//   - Les cascades sont faites explicitement par les services
//
// ============================================================================

pub mod health;
pub mod users;
pub mod market;
pub mod holding;
pub mod alert;
pub mod transaction_log;
pub mod dto;
