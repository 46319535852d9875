// Kept in sync with `store::SCHEMA_SQL`.

diesel::table! {
    departments (id) {
        id -> BigInt,
        dept_code -> Text,
        dept_name -> Text,
    }
}

diesel::table! {
    batches (id) {
        id -> BigInt,
        dept_id -> BigInt,
        batch_name -> Text,
    }
}

diesel::table! {
    sections (id) {
        id -> BigInt,
        batch_id -> BigInt,
        section_name -> Text,
    }
}

diesel::table! {
    students (id) {
        id -> BigInt,
        roll_number -> Text,
        full_name -> Text,
        email -> Nullable<Text>,
        section_id -> BigInt,
    }
}

diesel::table! {
    timetable (id) {
        id -> BigInt,
        section_id -> BigInt,
        semester -> Integer,
        day -> Text,
        slot_number -> Integer,
        course_code -> Text,
        course_name -> Text,
        faculty_name -> Text,
        room_info -> Nullable<Text>,
    }
}

diesel::table! {
    sessions (id) {
        id -> BigInt,
        timetable_id -> BigInt,
        session_date -> Date,
        category -> Text,
        actual_course_code -> Nullable<Text>,
        actual_course_name -> Nullable<Text>,
        is_verified_by_faculty -> Bool,
    }
}

diesel::table! {
    records (session_id, student_id) {
        session_id -> BigInt,
        student_id -> BigInt,
        status -> Text,
    }
}

diesel::joinable!(batches -> departments (dept_id));
diesel::joinable!(sections -> batches (batch_id));
diesel::joinable!(students -> sections (section_id));
diesel::joinable!(timetable -> sections (section_id));
diesel::joinable!(sessions -> timetable (timetable_id));
diesel::joinable!(records -> sessions (session_id));
diesel::joinable!(records -> students (student_id));

diesel::allow_tables_to_appear_in_same_query!(
    departments,
    batches,
    sections,
    students,
    timetable,
    sessions,
    records,
);
