// Copyright 2023 Remi Bernotavicius

use crate::{Error, Result};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum::{EnumIter, EnumString};

pub mod dispatch;
pub mod predicate;

/// The named search strategies a caller can ask for. Parsed from either the upper-case name or
/// the older `by_...` value.
#[derive(Debug, Display, EnumString, EnumIter, Hash, Copy, Clone, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum FilterCriterion {
    #[strum(serialize = "INSTRUCTION", serialize = "by_instruction")]
    #[display("INSTRUCTION")]
    Instruction,
    #[strum(serialize = "IS_VEGETARIAN", serialize = "by_is_vegetarian")]
    #[display("IS_VEGETARIAN")]
    IsVegetarian,
    #[strum(serialize = "NUMBER_OF_SERVINGS", serialize = "by_number_of_servings")]
    #[display("NUMBER_OF_SERVINGS")]
    NumberOfServings,
    #[strum(
        serialize = "NUMBER_OF_SERVINGS_GREATER_THAN_EQUAL",
        serialize = "by_number_of_servings_greater_than_equal"
    )]
    #[display("NUMBER_OF_SERVINGS_GREATER_THAN_EQUAL")]
    NumberOfServingsGreaterThanEqual,
    #[strum(serialize = "INCL_INGREDIENTS", serialize = "by_incl_ingredients")]
    #[display("INCL_INGREDIENTS")]
    InclIngredients,
    #[strum(serialize = "EXCL_INGREDIENTS", serialize = "by_excl_ingredients")]
    #[display("EXCL_INGREDIENTS")]
    ExclIngredients,
    #[strum(
        serialize = "IS_VEGETARIAN_AND_NUMBER_OF_SERVINGS",
        serialize = "by_is_vegetarian_and_number_of_servings"
    )]
    #[display("IS_VEGETARIAN_AND_NUMBER_OF_SERVINGS")]
    IsVegetarianAndNumberOfServings,
    #[strum(
        serialize = "INGREDIENT_AND_NUMBER_OF_SERVINGS",
        serialize = "by_ingredient_and_number_of_servings"
    )]
    #[display("INGREDIENT_AND_NUMBER_OF_SERVINGS")]
    IngredientAndNumberOfServings,
    #[strum(
        serialize = "EXCL_INGREDIENT_AND_INCL_INSTRUCTION",
        serialize = "excl_ingredient_and_incl_instruction"
    )]
    #[display("EXCL_INGREDIENT_AND_INCL_INSTRUCTION")]
    ExclIngredientAndInclInstruction,
    #[strum(
        serialize = "INSTRUCTION_AND_IS_VEGETARIAN_AND_NUMBER_OF_SERVINGS",
        serialize = "by_instruction_and_is_vegetarian_and_number_of_servings"
    )]
    #[display("INSTRUCTION_AND_IS_VEGETARIAN_AND_NUMBER_OF_SERVINGS")]
    InstructionAndIsVegetarianAndNumberOfServings,
    #[strum(
        serialize = "INGREDIENTS_AND_INSTRUCTION_AND_IS_VEGETARIAN_AND_NUMBER_OF_SERVINGS",
        serialize = "by_ingredients_and_instruction_and_is_vegetarian_and_number_of_servings"
    )]
    #[display("INGREDIENTS_AND_INSTRUCTION_AND_IS_VEGETARIAN_AND_NUMBER_OF_SERVINGS")]
    IngredientsAndInstructionAndIsVegetarianAndNumberOfServings,
}

impl FilterCriterion {
    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }
}

/// The search filter as it arrives over the wire: a criterion name plus a bag of values, only
/// some of which the criterion uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilterRequest {
    pub filter_criteria: String,
    #[serde(default)]
    pub filter_values: FilterValues,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterValues {
    pub ingredients: Option<BTreeSet<String>>,
    pub instruction: Option<String>,
    pub is_vegetarian: Option<bool>,
    pub number_of_servings: Option<i32>,
}

/// A validated search filter; each variant holds exactly what its criterion needs.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchFilter {
    Instruction {
        instruction: String,
    },
    IsVegetarian {
        is_vegetarian: bool,
    },
    NumberOfServings {
        number_of_servings: i32,
    },
    NumberOfServingsGreaterThanEqual {
        number_of_servings: i32,
    },
    InclIngredients {
        ingredients: BTreeSet<String>,
    },
    ExclIngredients {
        ingredients: BTreeSet<String>,
    },
    IsVegetarianAndNumberOfServings {
        is_vegetarian: bool,
        number_of_servings: i32,
    },
    IngredientAndNumberOfServings {
        ingredients: BTreeSet<String>,
        number_of_servings: i32,
    },
    ExclIngredientAndInclInstruction {
        ingredients: BTreeSet<String>,
        instruction: String,
    },
    InstructionAndIsVegetarianAndNumberOfServings {
        instruction: String,
        is_vegetarian: bool,
        number_of_servings: i32,
    },
    IngredientsAndInstructionAndIsVegetarianAndNumberOfServings {
        ingredients: BTreeSet<String>,
        instruction: String,
        is_vegetarian: bool,
        number_of_servings: i32,
    },
}

fn required<T>(value: Option<T>, criterion: FilterCriterion, field: &str) -> Result<T> {
    value.ok_or_else(|| {
        Error::bad_request(format!(
            "filter criteria {criterion} requires filter value {field}"
        ))
    })
}

impl FilterValues {
    fn ingredients(&mut self, criterion: FilterCriterion) -> Result<BTreeSet<String>> {
        required(self.ingredients.take(), criterion, "ingredients")
    }

    fn instruction(&mut self, criterion: FilterCriterion) -> Result<String> {
        required(self.instruction.take(), criterion, "instruction")
    }

    fn is_vegetarian(&mut self, criterion: FilterCriterion) -> Result<bool> {
        required(self.is_vegetarian.take(), criterion, "is_vegetarian")
    }

    fn number_of_servings(&mut self, criterion: FilterCriterion) -> Result<i32> {
        required(self.number_of_servings.take(), criterion, "number_of_servings")
    }
}

impl SearchFilter {
    /// `Ok(None)` when the criterion is not one we know and `strict` is off.
    pub fn from_request(request: SearchFilterRequest, strict: bool) -> Result<Option<Self>> {
        let SearchFilterRequest {
            filter_criteria,
            filter_values,
        } = request;
        match filter_criteria.parse::<FilterCriterion>() {
            Ok(criterion) => Self::new(criterion, filter_values).map(Some),
            Err(_) if strict => {
                let known: Vec<String> = FilterCriterion::iter().map(|c| c.to_string()).collect();
                Err(Error::bad_request(format!(
                    "unsupported filter criteria {filter_criteria:?}, expected one of: {}",
                    known.join(", ")
                )))
            }
            Err(_) => {
                log::warn!("ignoring unsupported filter criteria {filter_criteria:?}");
                Ok(None)
            }
        }
    }

    pub fn new(criterion: FilterCriterion, mut values: FilterValues) -> Result<Self> {
        use FilterCriterion as C;

        let c = criterion;
        Ok(match criterion {
            C::Instruction => Self::Instruction {
                instruction: values.instruction(c)?,
            },
            C::IsVegetarian => Self::IsVegetarian {
                is_vegetarian: values.is_vegetarian(c)?,
            },
            C::NumberOfServings => Self::NumberOfServings {
                number_of_servings: values.number_of_servings(c)?,
            },
            C::NumberOfServingsGreaterThanEqual => Self::NumberOfServingsGreaterThanEqual {
                number_of_servings: values.number_of_servings(c)?,
            },
            C::InclIngredients => Self::InclIngredients {
                ingredients: values.ingredients(c)?,
            },
            C::ExclIngredients => Self::ExclIngredients {
                ingredients: values.ingredients(c)?,
            },
            C::IsVegetarianAndNumberOfServings => Self::IsVegetarianAndNumberOfServings {
                is_vegetarian: values.is_vegetarian(c)?,
                number_of_servings: values.number_of_servings(c)?,
            },
            C::IngredientAndNumberOfServings => Self::IngredientAndNumberOfServings {
                ingredients: values.ingredients(c)?,
                number_of_servings: values.number_of_servings(c)?,
            },
            C::ExclIngredientAndInclInstruction => Self::ExclIngredientAndInclInstruction {
                ingredients: values.ingredients(c)?,
                instruction: values.instruction(c)?,
            },
            C::InstructionAndIsVegetarianAndNumberOfServings => {
                Self::InstructionAndIsVegetarianAndNumberOfServings {
                    instruction: values.instruction(c)?,
                    is_vegetarian: values.is_vegetarian(c)?,
                    number_of_servings: values.number_of_servings(c)?,
                }
            }
            C::IngredientsAndInstructionAndIsVegetarianAndNumberOfServings => {
                Self::IngredientsAndInstructionAndIsVegetarianAndNumberOfServings {
                    ingredients: values.ingredients(c)?,
                    instruction: values.instruction(c)?,
                    is_vegetarian: values.is_vegetarian(c)?,
                    number_of_servings: values.number_of_servings(c)?,
                }
            }
        })
    }

    pub fn criterion(&self) -> FilterCriterion {
        use FilterCriterion as C;

        match self {
            Self::Instruction { .. } => C::Instruction,
            Self::IsVegetarian { .. } => C::IsVegetarian,
            Self::NumberOfServings { .. } => C::NumberOfServings,
            Self::NumberOfServingsGreaterThanEqual { .. } => C::NumberOfServingsGreaterThanEqual,
            Self::InclIngredients { .. } => C::InclIngredients,
            Self::ExclIngredients { .. } => C::ExclIngredients,
            Self::IsVegetarianAndNumberOfServings { .. } => C::IsVegetarianAndNumberOfServings,
            Self::IngredientAndNumberOfServings { .. } => C::IngredientAndNumberOfServings,
            Self::ExclIngredientAndInclInstruction { .. } => C::ExclIngredientAndInclInstruction,
            Self::InstructionAndIsVegetarianAndNumberOfServings { .. } => {
                C::InstructionAndIsVegetarianAndNumberOfServings
            }
            Self::IngredientsAndInstructionAndIsVegetarianAndNumberOfServings { .. } => {
                C::IngredientsAndInstructionAndIsVegetarianAndNumberOfServings
            }
        }
    }
}

#[test]
fn criterion_names() {
    for criterion in FilterCriterion::iter() {
        let parsed: FilterCriterion = criterion.to_string().parse().unwrap();
        assert_eq!(parsed, criterion);
    }
    assert_eq!(
        "by_is_vegetarian".parse::<FilterCriterion>().unwrap(),
        FilterCriterion::IsVegetarian
    );
    assert_eq!(
        "excl_ingredient_and_incl_instruction"
            .parse::<FilterCriterion>()
            .unwrap(),
        FilterCriterion::ExclIngredientAndInclInstruction
    );
    assert!("BY_COLOUR".parse::<FilterCriterion>().is_err());
}

#[test]
fn filter_from_request() {
    use crate::error::Status;
    use maplit::btreeset;

    let request = SearchFilterRequest {
        filter_criteria: "INGREDIENT_AND_NUMBER_OF_SERVINGS".into(),
        filter_values: FilterValues {
            ingredients: Some(btreeset! {"egg".into()}),
            number_of_servings: Some(3),
            // Not used by the criterion.
            instruction: Some("bake".into()),
            ..Default::default()
        },
    };
    let filter = SearchFilter::from_request(request, false).unwrap().unwrap();
    assert_eq!(
        filter,
        SearchFilter::IngredientAndNumberOfServings {
            ingredients: btreeset! {"egg".into()},
            number_of_servings: 3,
        }
    );
    assert_eq!(
        filter.criterion(),
        FilterCriterion::IngredientAndNumberOfServings
    );

    let request = SearchFilterRequest {
        filter_criteria: "IS_VEGETARIAN_AND_NUMBER_OF_SERVINGS".into(),
        filter_values: FilterValues {
            is_vegetarian: Some(true),
            ..Default::default()
        },
    };
    let error = SearchFilter::from_request(request, false).unwrap_err();
    assert_eq!(error.status(), Some(Status::BadRequest));
    assert_eq!(
        error.to_string(),
        "filter criteria IS_VEGETARIAN_AND_NUMBER_OF_SERVINGS requires filter value \
        number_of_servings"
    );
}

#[test]
fn unknown_criterion() {
    use crate::error::Status;

    let request = SearchFilterRequest {
        filter_criteria: "BY_COLOUR".into(),
        filter_values: FilterValues::default(),
    };
    assert_eq!(
        SearchFilter::from_request(request.clone(), false).unwrap(),
        None
    );
    let error = SearchFilter::from_request(request, true).unwrap_err();
    assert_eq!(error.status(), Some(Status::BadRequest));
    let message = error.to_string();
    assert!(message.starts_with("unsupported filter criteria \"BY_COLOUR\", expected one of: "));
    assert!(message.contains("INSTRUCTION, IS_VEGETARIAN, NUMBER_OF_SERVINGS, "));
    assert!(message
        .ends_with("INGREDIENTS_AND_INSTRUCTION_AND_IS_VEGETARIAN_AND_NUMBER_OF_SERVINGS"));
}
