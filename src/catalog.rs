//! Built-in exercises and starter routines.
//!
//! User data is always merged on top of this catalog by id so a stored
//! library never hides a built-in exercise.

use phf::phf_map;

use crate::migrate::CURRENT_SCHEMA_VERSION;
use crate::model::{Exercise, Millis, Routine, RoutineExercise, RoutineFocus, SubRoutine};

/// Static description of a built-in exercise.
#[derive(Debug, Clone, Copy)]
pub struct DefaultExercise {
    pub name: &'static str,
    pub muscle_groups: &'static [&'static str],
    pub equipment: &'static str,
    pub pattern: Option<&'static str>,
    pub rest_seconds: Option<u32>,
}

pub const MUSCLE_CATEGORIES: [&str; 10] = [
    "Pecho",
    "Espalda",
    "Hombros",
    "Bíceps",
    "Tríceps",
    "Cuádriceps",
    "Isquiotibiales",
    "Glúteos",
    "Abdomen",
    "Cardio",
];

pub const EQUIPMENT_CATEGORIES: [&str; 7] = [
    "Barra",
    "Mancuernas",
    "Máquina",
    "Polea",
    "Peso Corporal",
    "Kettlebell",
    "Otros",
];

pub static EXERCISES: phf::Map<&'static str, DefaultExercise> = phf_map! {
    "ex_001" => DefaultExercise {
        name: "Dominada",
        muscle_groups: &["Espalda", "Bíceps"],
        equipment: "Peso Corporal",
        pattern: Some("Tracción vertical"),
        rest_seconds: Some(120),
    },
    "ex_014" => DefaultExercise {
        name: "Remo con Barra",
        muscle_groups: &["Espalda", "Bíceps"],
        equipment: "Barra",
        pattern: Some("Tracción horizontal"),
        rest_seconds: Some(120),
    },
    "ex_045" => DefaultExercise {
        name: "Jalón al Pecho",
        muscle_groups: &["Espalda", "Bíceps"],
        equipment: "Polea",
        pattern: Some("Tracción vertical"),
        rest_seconds: Some(90),
    },
    "ex_101" => DefaultExercise {
        name: "Press de Banca con Barra",
        muscle_groups: &["Pecho", "Tríceps", "Hombros"],
        equipment: "Barra",
        pattern: Some("Empuje horizontal"),
        rest_seconds: Some(150),
    },
    "ex_122" => DefaultExercise {
        name: "Press de Banca Agarre Cerrado",
        muscle_groups: &["Tríceps", "Pecho"],
        equipment: "Barra",
        pattern: Some("Empuje horizontal"),
        rest_seconds: Some(120),
    },
    "ex_130" => DefaultExercise {
        name: "Aperturas con Mancuernas",
        muscle_groups: &["Pecho"],
        equipment: "Mancuernas",
        pattern: None,
        rest_seconds: Some(60),
    },
    "ex_210" => DefaultExercise {
        name: "Curl con Barra",
        muscle_groups: &["Bíceps"],
        equipment: "Barra",
        pattern: None,
        rest_seconds: Some(60),
    },
    "ex_225" => DefaultExercise {
        name: "Extensión de Tríceps en Polea",
        muscle_groups: &["Tríceps"],
        equipment: "Polea",
        pattern: None,
        rest_seconds: Some(60),
    },
    "ex_290" => DefaultExercise {
        name: "Sentadilla Trasera con Barra",
        muscle_groups: &["Cuádriceps", "Glúteos"],
        equipment: "Barra",
        pattern: Some("Dominante de rodilla"),
        rest_seconds: Some(180),
    },
    "ex_301" => DefaultExercise {
        name: "Peso Muerto Rumano",
        muscle_groups: &["Isquiotibiales", "Glúteos"],
        equipment: "Barra",
        pattern: Some("Bisagra de cadera"),
        rest_seconds: Some(150),
    },
    "ex_310" => DefaultExercise {
        name: "Prensa de Piernas",
        muscle_groups: &["Cuádriceps", "Glúteos"],
        equipment: "Máquina",
        pattern: Some("Dominante de rodilla"),
        rest_seconds: Some(120),
    },
    "ex_345" => DefaultExercise {
        name: "Press Militar con Barra",
        muscle_groups: &["Hombros", "Tríceps"],
        equipment: "Barra",
        pattern: Some("Empuje vertical"),
        rest_seconds: Some(120),
    },
    "ex_360" => DefaultExercise {
        name: "Elevaciones Laterales",
        muscle_groups: &["Hombros"],
        equipment: "Mancuernas",
        pattern: None,
        rest_seconds: Some(60),
    },
    "ex_400" => DefaultExercise {
        name: "Plancha",
        muscle_groups: &["Abdomen"],
        equipment: "Peso Corporal",
        pattern: None,
        rest_seconds: Some(45),
    },
    "ex_450" => DefaultExercise {
        name: "Remo en Máquina de Cardio",
        muscle_groups: &["Cardio"],
        equipment: "Máquina",
        pattern: None,
        rest_seconds: None,
    },
};

/// Lookup the built-in entry for an exercise id.
pub fn info_for(id: &str) -> Option<&'static DefaultExercise> {
    EXERCISES.get(id)
}

pub fn is_builtin(id: &str) -> bool {
    EXERCISES.contains_key(id)
}

fn to_exercise(id: &str, info: &DefaultExercise) -> Exercise {
    Exercise {
        id: id.to_string(),
        name: info.name.to_string(),
        muscle_groups: info.muscle_groups.iter().map(|m| m.to_string()).collect(),
        equipment: info.equipment.to_string(),
        pattern: info.pattern.map(str::to_string),
        subtype: None,
        description: None,
        media_url: None,
        media_type: None,
        default_rest_seconds: info.rest_seconds,
        schema_version: CURRENT_SCHEMA_VERSION,
    }
}

/// All built-in exercises ordered by id.
pub fn default_exercises() -> Vec<Exercise> {
    let mut ids: Vec<&&str> = EXERCISES.keys().collect();
    ids.sort();
    ids.into_iter()
        .filter_map(|id| EXERCISES.get(*id).map(|info| to_exercise(id, info)))
        .collect()
}

/// Append every built-in exercise whose id is absent from `user`.
///
/// User entries keep their position and win over built-ins with the same id.
pub fn merge_with_defaults(mut user: Vec<Exercise>) -> Vec<Exercise> {
    let missing: Vec<Exercise> = default_exercises()
        .into_iter()
        .filter(|def| !user.iter().any(|u| u.id == def.id))
        .collect();
    if !missing.is_empty() {
        log::debug!("Restoring {} built-in exercises", missing.len());
    }
    user.extend(missing);
    user
}

fn routine_exercise(id: &str, exercise_id: &str, sets: &str, reps: &str) -> RoutineExercise {
    RoutineExercise {
        id: id.into(),
        exercise_id: exercise_id.into(),
        sets: sets.into(),
        reps: reps.into(),
        weight_placeholder: None,
        mode: None,
    }
}

/// Starter routines shown before the user builds their own.
pub fn default_routines(created_at: Millis) -> Vec<Routine> {
    vec![
        Routine {
            id: "rt_1".into(),
            name: "Rutina de Ejemplo PPL".into(),
            focus: RoutineFocus::Ppl,
            created_at,
            sub_routines: vec![
                SubRoutine {
                    id: "sr_1".into(),
                    name: "Empuje (Push)".into(),
                    exercises: vec![
                        routine_exercise("re_1", "ex_122", "4", "6-8"),
                        routine_exercise("re_2", "ex_345", "3", "8-10"),
                    ],
                },
                SubRoutine {
                    id: "sr_2".into(),
                    name: "Tracción (Pull)".into(),
                    exercises: vec![routine_exercise("re_4", "ex_001", "4", "Al fallo")],
                },
            ],
        },
        Routine {
            id: "rt_2".into(),
            name: "Cuerpo Completo".into(),
            focus: RoutineFocus::FullBody,
            created_at,
            sub_routines: vec![SubRoutine {
                id: "sr_fb_1".into(),
                name: "Día Único".into(),
                exercises: vec![routine_exercise("re_fb_1", "ex_290", "3", "10")],
            }],
        },
    ]
}
