diesel::table! {
    meetings (id) {
        id -> Integer,
        title -> Text,
        description -> Nullable<Text>,
        date -> Nullable<Timestamp>,
        duration -> Nullable<Integer>,
        participants -> Nullable<Text>,
        status -> Nullable<Text>,
        audio_file_path -> Nullable<Text>,
        transcript -> Nullable<Text>,
        summary -> Nullable<Text>,
        calendar_event_id -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    action_items (id) {
        id -> Integer,
        meeting_id -> Integer,
        title -> Text,
        description -> Text,
        assignee -> Text,
        due_date -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    decisions (id) {
        id -> Integer,
        meeting_id -> Integer,
        title -> Text,
        description -> Text,
        decision_maker -> Text,
        rationale -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::joinable!(action_items -> meetings (meeting_id));
diesel::joinable!(decisions -> meetings (meeting_id));

diesel::allow_tables_to_appear_in_same_query!(meetings, action_items, decisions);
